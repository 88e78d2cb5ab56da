// Direct notification routes.
//
// POST /api/notify/content-flagged/{user_id}
// POST /api/notify/media-misuse/{user_id}
//
// The JSON object body becomes the event payload. The response is the
// composite dispatch result: {"success": true, "channels": {...}}.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};

use super::dispatch_and_record;
use crate::notify::channel::NotificationKind;
use crate::web::{api_error, AppState};

pub async fn content_flagged(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> Response {
    notify(state, user_id, NotificationKind::FlaggedContent, payload).await
}

pub async fn media_misuse(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<Map<String, Value>>,
) -> Response {
    notify(state, user_id, NotificationKind::MediaMisuse, payload).await
}

async fn notify(
    state: AppState,
    user_id: String,
    kind: NotificationKind,
    payload: Map<String, Value>,
) -> Response {
    let Some(user_id) = super::normalize_user_id(&user_id) else {
        return api_error(StatusCode::BAD_REQUEST, "user_id must not be empty");
    };
    let result = dispatch_and_record(&state, user_id, kind, payload).await;
    Json(result).into_response()
}
