// POST /api/users: register or update a user's contact details.
//
// Body: {id, email?, phone?, display_name?}. Mail and SMS notifications
// resolve their recipient through these records.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::models::UserRecord;
use crate::web::{api_error, AppState};

#[derive(Deserialize)]
pub struct RegisterUser {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub display_name: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn register_user(State(state): State<AppState>, Json(req): Json<RegisterUser>) -> Response {
    let id = req.id.trim().to_string();
    if id.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "id must not be empty");
    }
    let email = non_blank(req.email);
    if email.as_deref().is_some_and(|e| !e.contains('@')) {
        return api_error(StatusCode::BAD_REQUEST, "email is not a valid address");
    }

    let user = UserRecord {
        id,
        email,
        phone: non_blank(req.phone),
        display_name: non_blank(req.display_name),
        created_at: String::new(),
    };

    if let Err(e) = state.db.upsert_user(&user).await {
        warn!(user_id = %user.id, error = %e, "Failed to store user");
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store user");
    }
    info!(user_id = %user.id, "Registered user");

    (StatusCode::CREATED, Json(user)).into_response()
}
