// GET /api/status: detector mode, live stream connections, stored analysis
// counts and the review backlog in one round-trip, stamped with the server
// time.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::web::AppState;

pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let (total, flagged) = state.db.analysis_counts().await.unwrap_or_default();
    let pending_flags = state.db.pending_flag_count().await.unwrap_or_default();
    let users = state.db.user_count().await.unwrap_or_default();

    Json(serde_json::json!({
        "detector_mode": state.detectors.mode().as_str(),
        "detectors_available": state.detectors.is_available(),
        "live_connections": state.registry.len().await,
        "users": users,
        "analyses": {
            "total": total,
            "flagged": flagged,
            "pending_flags": pending_flags,
        },
        "checked_at": chrono::Utc::now().to_rfc3339(),
    }))
}
