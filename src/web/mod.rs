// Web server: Axum JSON API plus the persistent notification stream.
//
// Every service is built once at startup and shared through AppState:
// the database, the detector suite, the connection registry and the
// dispatcher that fans notifications out over mail, SMS and the stream.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::db::Database;
use crate::detectors::DetectorSuite;
use crate::notify::directory::DatabaseDirectory;
use crate::notify::dispatcher::Dispatcher;
use crate::notify::registry::ConnectionRegistry;

pub mod handlers;
pub mod stream;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub config: Arc<Config>,
    pub detectors: Arc<DetectorSuite>,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Wire up the production services: detectors from config, the
    /// database-backed user directory, and the three-channel dispatcher.
    pub async fn build(config: Config, db: Arc<dyn Database>) -> Result<Self> {
        let detectors = DetectorSuite::from_config(&config).await;
        let registry = Arc::new(ConnectionRegistry::new());
        let directory = Arc::new(DatabaseDirectory::new(Arc::clone(&db)));
        let dispatcher = crate::notify::build_dispatcher(&config, directory, Arc::clone(&registry))?;

        Ok(Self {
            db,
            config: Arc::new(config),
            detectors: Arc::new(detectors),
            registry,
            dispatcher: Arc::new(dispatcher),
        })
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(state: AppState, port: u16, bind: &str) -> Result<()> {
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("DeepShield API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(handlers::status::get_status))
        .route(
            "/api/notify/content-flagged/{user_id}",
            post(handlers::notify::content_flagged),
        )
        .route(
            "/api/notify/media-misuse/{user_id}",
            post(handlers::notify::media_misuse),
        )
        .route("/ws/{user_id}", get(stream::connect))
        .route("/api/analyze/text", post(handlers::analyze::analyze_text))
        .route("/api/analyze/image", post(handlers::analyze::analyze_image))
        .route("/api/analyze/deepfake", post(handlers::analyze::analyze_deepfake))
        .route("/api/analyze/video", post(handlers::analyze::analyze_video))
        .route("/api/verify/face", post(handlers::verify::verify_faces))
        .route("/api/verify/profile", post(handlers::verify::verify_profile))
        .route("/api/extract/face", post(handlers::verify::extract_face))
        .route("/api/analyses", get(handlers::analyses::list_analyses))
        .route(
            "/api/analyses/{id}/status",
            patch(handlers::analyses::update_status),
        )
        .route("/api/users", post(handlers::users::register_user))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
