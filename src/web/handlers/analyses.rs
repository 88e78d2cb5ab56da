// Stored detector results and their review workflow.
//
// GET   /api/analyses              recent results, newest first.
//                                  Optional ?limit= (default 50, max 500).
// PATCH /api/analyses/{id}/status  body {status}: move a result through
//                                  pending/reviewing/resolved/dismissed.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::models::ReviewStatus;
use crate::web::{api_error, AppState};

#[derive(Deserialize, Default)]
pub struct AnalysesQuery {
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn list_analyses(
    State(state): State<AppState>,
    Query(params): Query<AnalysesQuery>,
) -> Response {
    let limit = params.limit.unwrap_or(50).min(500);
    match state.db.get_recent_analyses(limit).await {
        Ok(analyses) => Json(serde_json::json!({ "analyses": analyses })).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load analyses");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load analyses")
        }
    }
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<StatusUpdate>,
) -> Response {
    let Some(status) = ReviewStatus::parse(&req.status) else {
        let valid: Vec<&str> = ReviewStatus::ALL.iter().map(|s| s.as_str()).collect();
        return api_error(
            StatusCode::BAD_REQUEST,
            &format!("Invalid status. Must be one of: {}", valid.join(", ")),
        );
    };

    match state.db.update_analysis_status(id, status).await {
        Ok(true) => {
            info!(id, status = %status, "Updated review status");
            Json(serde_json::json!({ "id": id, "status": status })).into_response()
        }
        Ok(false) => api_error(StatusCode::NOT_FOUND, "Analysis not found"),
        Err(e) => {
            warn!(id, error = %e, "Failed to update review status");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update status")
        }
    }
}
