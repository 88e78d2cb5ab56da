// Route handlers, grouped by resource.
//
// Shared helpers here persist detector results and dispatch notifications.
// Neither ever fails a request: a database or delivery problem is logged
// and the handler still returns the detector result.

pub mod analyses;
pub mod analyze;
pub mod notify;
pub mod status;
pub mod users;
pub mod verify;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::db::models::{AnalysisKind, NewAnalysis};
use crate::notify::channel::NotificationKind;
use crate::notify::dispatcher::DispatchResult;
use crate::web::AppState;

/// Trim a user id taken from a path segment or request field. Blank ids
/// are rejected so every route registers and notifies the same key.
pub(crate) fn normalize_user_id(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Store a detector result. Returns the row id, or None if the write failed.
pub(crate) async fn record_analysis<T: Serialize>(
    state: &AppState,
    kind: AnalysisKind,
    user_id: Option<&str>,
    subject: &str,
    flagged: bool,
    confidence: f64,
    result: &T,
) -> Option<i64> {
    let result_json = match serde_json::to_string(result) {
        Ok(json) => json,
        Err(e) => {
            warn!(kind = %kind, error = %e, "Failed to encode analysis result");
            return None;
        }
    };

    let analysis = NewAnalysis {
        user_id: user_id.map(str::to_string),
        kind,
        subject: crate::output::truncate_chars(subject, 200),
        flagged,
        confidence,
        result_json,
    };

    match state.db.insert_analysis(&analysis).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(kind = %kind, error = %e, "Failed to store analysis");
            None
        }
    }
}

/// Dispatch a notification and store the per-channel outcome.
pub(crate) async fn dispatch_and_record(
    state: &AppState,
    user_id: &str,
    kind: NotificationKind,
    payload: Map<String, Value>,
) -> DispatchResult {
    let result = match kind {
        NotificationKind::FlaggedContent => {
            state.dispatcher.notify_content_flagged(user_id, payload).await
        }
        NotificationKind::MediaMisuse => state.dispatcher.notify_media_misuse(user_id, payload).await,
        NotificationKind::Other(_) => {
            let event = crate::notify::channel::NotificationEvent::new(user_id, kind.clone(), payload);
            state.dispatcher.dispatch(&event).await
        }
    };

    let channels = serde_json::to_string(&result.channels).unwrap_or_else(|_| "{}".to_string());
    if let Err(e) = state
        .db
        .record_notification(user_id, kind.as_str(), &channels)
        .await
    {
        warn!(user_id, error = %e, "Failed to store notification outcome");
    }

    result
}

/// Build a notification payload from string pairs plus a confidence score.
pub(crate) fn payload(fields: &[(&str, &str)], confidence: f64) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert((*key).to_string(), Value::String((*value).to_string()));
    }
    map.insert("confidence".to_string(), Value::from(confidence));
    map
}
