// Analysis routes.
//
// POST /api/analyze/text      {text, language?, user_id?}
// POST /api/analyze/image     {path, user_id?}
// POST /api/analyze/deepfake  {path, user_id?}
// POST /api/analyze/video     {path, user_id?}
//
// Detectors never fail, so these routes only reject malformed input. Every
// result is stored; a flagged result with a user_id also notifies that user
// (content-flagged for moderation, media-misuse for deepfakes).

use std::path::PathBuf;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{dispatch_and_record, payload, record_analysis};
use crate::db::models::AnalysisKind;
use crate::notify::channel::NotificationKind;
use crate::web::{api_error, AppState};

#[derive(Deserialize)]
pub struct TextRequest {
    pub text: String,
    pub language: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct MediaRequest {
    pub path: String,
    pub user_id: Option<String>,
}

/// Treat blank user ids as absent.
fn user_of(user_id: &Option<String>) -> Option<&str> {
    user_id.as_deref().and_then(super::normalize_user_id)
}

pub async fn analyze_text(State(state): State<AppState>, Json(req): Json<TextRequest>) -> Response {
    if req.text.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "text must not be empty");
    }

    let result = state
        .detectors
        .analyze_text(&req.text, req.language.as_deref())
        .await;
    let user_id = user_of(&req.user_id);

    let analysis_id = record_analysis(
        &state,
        AnalysisKind::Text,
        user_id,
        &req.text,
        result.is_toxic,
        result.confidence,
        &result,
    )
    .await;

    let notification = match user_id {
        Some(user_id) if result.is_toxic => {
            let reason = if result.matched_terms.is_empty() {
                "Toxic language detected".to_string()
            } else {
                format!("Blacklisted terms: {}", result.matched_terms.join(", "))
            };
            Some(
                dispatch_and_record(
                    &state,
                    user_id,
                    NotificationKind::FlaggedContent,
                    payload(
                        &[
                            ("type", "text"),
                            ("reason", &reason),
                            ("details", "Your content has been flagged for review."),
                        ],
                        result.confidence,
                    ),
                )
                .await,
            )
        }
        _ => None,
    };

    Json(json!({
        "analysis_id": analysis_id,
        "result": result,
        "notification": notification,
    }))
    .into_response()
}

pub async fn analyze_image(State(state): State<AppState>, Json(req): Json<MediaRequest>) -> Response {
    let Some(path) = media_path(&req.path) else {
        return api_error(StatusCode::BAD_REQUEST, "path must not be empty");
    };

    let result = state.detectors.moderate_image(&path).await;
    let user_id = user_of(&req.user_id);

    let analysis_id = record_analysis(
        &state,
        AnalysisKind::Image,
        user_id,
        &req.path,
        result.is_explicit,
        result.confidence,
        &result,
    )
    .await;

    let notification = match user_id {
        Some(user_id) if result.is_explicit => Some(
            dispatch_and_record(
                &state,
                user_id,
                NotificationKind::FlaggedContent,
                payload(
                    &[
                        ("type", "image"),
                        ("reason", "Explicit content detected"),
                        ("details", "Your content has been flagged for review."),
                    ],
                    result.confidence,
                ),
            )
            .await,
        ),
        _ => None,
    };

    Json(json!({
        "analysis_id": analysis_id,
        "result": result,
        "notification": notification,
    }))
    .into_response()
}

pub async fn analyze_deepfake(
    State(state): State<AppState>,
    Json(req): Json<MediaRequest>,
) -> Response {
    let Some(path) = media_path(&req.path) else {
        return api_error(StatusCode::BAD_REQUEST, "path must not be empty");
    };

    let result = state.detectors.analyze_image(&path).await;
    let user_id = user_of(&req.user_id);

    let analysis_id = record_analysis(
        &state,
        AnalysisKind::DeepfakeImage,
        user_id,
        &req.path,
        result.is_deepfake,
        result.confidence,
        &result,
    )
    .await;

    let notification = match user_id {
        Some(user_id) if result.is_deepfake => {
            Some(notify_deepfake(&state, user_id, result.confidence).await)
        }
        _ => None,
    };

    Json(json!({
        "analysis_id": analysis_id,
        "result": result,
        "notification": notification,
    }))
    .into_response()
}

pub async fn analyze_video(State(state): State<AppState>, Json(req): Json<MediaRequest>) -> Response {
    let Some(path) = media_path(&req.path) else {
        return api_error(StatusCode::BAD_REQUEST, "path must not be empty");
    };

    let result = state.detectors.analyze_video(&path).await;
    let user_id = user_of(&req.user_id);

    let analysis_id = record_analysis(
        &state,
        AnalysisKind::DeepfakeVideo,
        user_id,
        &req.path,
        result.is_deepfake,
        result.confidence,
        &result,
    )
    .await;

    let notification = match user_id {
        Some(user_id) if result.is_deepfake => {
            Some(notify_deepfake(&state, user_id, result.confidence).await)
        }
        _ => None,
    };

    Json(json!({
        "analysis_id": analysis_id,
        "result": result,
        "notification": notification,
    }))
    .into_response()
}

async fn notify_deepfake(
    state: &AppState,
    user_id: &str,
    confidence: f64,
) -> crate::notify::dispatcher::DispatchResult {
    dispatch_and_record(
        state,
        user_id,
        NotificationKind::MediaMisuse,
        payload(
            &[
                ("type", "deepfake"),
                ("details", "Potential deepfake detected in your media."),
            ],
            confidence,
        ),
    )
    .await
}

pub(crate) fn media_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}
