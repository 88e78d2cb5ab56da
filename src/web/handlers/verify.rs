// Face routes (identity verification).
//
// POST /api/verify/face     {image1, image2, user_id?}  same person in both?
// POST /api/verify/profile  {profile_image, reference_image, user_id?}
// POST /api/extract/face    {path, user_id?}            locate the face in one image

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::analyze::media_path;
use super::{normalize_user_id, record_analysis};
use crate::db::models::AnalysisKind;
use crate::web::{api_error, AppState};

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub image1: String,
    pub image2: String,
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub profile_image: String,
    pub reference_image: String,
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub path: String,
    pub user_id: Option<String>,
}

pub async fn verify_faces(State(state): State<AppState>, Json(req): Json<VerifyRequest>) -> Response {
    let (Some(image1), Some(image2)) = (media_path(&req.image1), media_path(&req.image2)) else {
        return api_error(StatusCode::BAD_REQUEST, "image1 and image2 are required");
    };

    let result = state.detectors.verify_faces(&image1, &image2).await;

    let analysis_id = record_analysis(
        &state,
        AnalysisKind::FaceVerification,
        req.user_id.as_deref().and_then(normalize_user_id),
        &format!("{} | {}", req.image1.trim(), req.image2.trim()),
        // A completed comparison that didn't match is what needs review
        result.error.is_none() && !result.matched,
        result.confidence,
        &result,
    )
    .await;

    Json(json!({ "analysis_id": analysis_id, "result": result })).into_response()
}

pub async fn verify_profile(State(state): State<AppState>, Json(req): Json<ProfileRequest>) -> Response {
    let (Some(profile), Some(reference)) = (
        media_path(&req.profile_image),
        media_path(&req.reference_image),
    ) else {
        return api_error(
            StatusCode::BAD_REQUEST,
            "profile_image and reference_image are required",
        );
    };

    let verification = state.detectors.verify_profile_image(&profile, &reference).await;

    let analysis_id = record_analysis(
        &state,
        AnalysisKind::FaceVerification,
        req.user_id.as_deref().and_then(normalize_user_id),
        &format!("{} | {}", verification.profile_image, verification.reference_image),
        verification.result.error.is_none() && !verification.result.matched,
        verification.result.confidence,
        &verification,
    )
    .await;

    Json(json!({ "analysis_id": analysis_id, "result": verification })).into_response()
}

pub async fn extract_face(State(state): State<AppState>, Json(req): Json<ExtractRequest>) -> Response {
    let Some(path) = media_path(&req.path) else {
        return api_error(StatusCode::BAD_REQUEST, "path must not be empty");
    };

    let result = state.detectors.extract_face(&path).await;

    let analysis_id = record_analysis(
        &state,
        AnalysisKind::FaceExtraction,
        req.user_id.as_deref().and_then(normalize_user_id),
        req.path.trim(),
        false,
        if result.success { 1.0 } else { 0.0 },
        &result,
    )
    .await;

    Json(json!({ "analysis_id": analysis_id, "result": result })).into_response()
}
