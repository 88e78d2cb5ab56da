// HTTP API end to end: router, handlers, SQLite and mock detectors.
//
// Requests go through the real router with tower's `oneshot`. Notification
// channels are recording doubles so tests can see what was dispatched.
#![cfg(feature = "web")]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use deepshield::config::Config;
use deepshield::detectors::DetectorSuite;
use deepshield::notify::channel::{ChannelName, NotificationChannel, NotificationEvent};
use deepshield::notify::dispatcher::Dispatcher;
use deepshield::notify::registry::ConnectionRegistry;
use deepshield::web::{build_router, AppState};

/// Records every event it is handed and reports a fixed outcome.
struct RecordingChannel {
    name: ChannelName,
    outcome: bool,
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingChannel {
    fn new(name: ChannelName, outcome: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            outcome,
            events: Mutex::new(Vec::new()),
        })
    }

    fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> ChannelName {
        self.name
    }

    async fn send(&self, event: &NotificationEvent) -> bool {
        self.events.lock().unwrap().push(event.clone());
        self.outcome
    }
}

struct Harness {
    state: AppState,
    mail: Arc<RecordingChannel>,
}

impl Harness {
    fn new() -> Self {
        let mail = RecordingChannel::new(ChannelName::Mail, true);
        let dispatcher = Dispatcher::new(
            mail.clone(),
            RecordingChannel::new(ChannelName::ShortMessage, false),
            RecordingChannel::new(ChannelName::PersistentStream, false),
            Duration::from_secs(1),
        );
        let state = AppState {
            db: deepshield::db::open_in_memory().unwrap(),
            config: Arc::new(Config::for_tests()),
            detectors: Arc::new(DetectorSuite::mock()),
            registry: Arc::new(ConnectionRegistry::new()),
            dispatcher: Arc::new(dispatcher),
        };
        Self { state, mail }
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn patch(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================
// Health and status
// ============================================================

#[tokio::test]
async fn health_is_ok() {
    let harness = Harness::new();
    let (status, body) = send(harness.router(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn status_reports_mode_and_counts() {
    let harness = Harness::new();
    send(
        harness.router(),
        post("/api/analyze/deepfake", json!({"path": "/u/fake.jpg"})),
    )
    .await;

    let (status, body) = send(harness.router(), get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detector_mode"], "mock");
    assert_eq!(body["detectors_available"], true);
    assert_eq!(body["live_connections"], 0);
    assert_eq!(
        body["analyses"],
        json!({"total": 1, "flagged": 1, "pending_flags": 1})
    );
    assert!(body["checked_at"].is_string());
}

// ============================================================
// Notification routes
// ============================================================

#[tokio::test]
async fn content_flagged_returns_composite_result() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        post(
            "/api/notify/content-flagged/alice",
            json!({"reason": "hate speech", "confidence": 0.9}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "channels": {"mail": true, "short_message": false, "persistent_stream": false}
        })
    );
    assert_eq!(harness.mail.count(), 1);

    let stored = harness.state.db.get_recent_notifications(5).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].user_id, "alice");
    assert_eq!(stored[0].kind, "flagged_content");
}

#[tokio::test]
async fn media_misuse_passes_payload_through() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        post("/api/notify/media-misuse/bob", json!({"type": "deepfake"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let events = harness.mail.events.lock().unwrap();
    assert_eq!(events[0].recipient_id(), "bob");
    assert_eq!(events[0].kind().as_str(), "media_misuse");
    assert_eq!(events[0].payload()["type"], "deepfake");
}

#[tokio::test]
async fn notify_trims_user_id_and_rejects_blank() {
    let harness = Harness::new();

    let (status, _) = send(
        harness.router(),
        post("/api/notify/content-flagged/%20alice%20", json!({"reason": "spam"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = harness.mail.events.lock().unwrap().clone();
    assert_eq!(events[0].recipient_id(), "alice");

    let (status, _) = send(
        harness.router(),
        post("/api/notify/media-misuse/%20%20", json!({"type": "deepfake"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(harness.mail.count(), 1);
}

#[tokio::test]
async fn notify_rejects_non_object_body() {
    let harness = Harness::new();
    let (status, _) = send(
        harness.router(),
        post("/api/notify/content-flagged/alice", json!(["not", "an", "object"])),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(harness.mail.count(), 0);
}

// ============================================================
// Analysis routes
// ============================================================

#[tokio::test]
async fn toxic_text_with_user_is_stored_and_notified() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        post(
            "/api/analyze/text",
            json!({"text": "I hate you", "language": "en", "user_id": "alice"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["is_toxic"], true);
    assert_eq!(body["result"]["matched_terms"], json!(["hate"]));
    assert!(body["analysis_id"].is_i64());
    assert_eq!(body["notification"]["success"], true);

    let events = harness.mail.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].payload()["reason"], "Blacklisted terms: hate");
}

#[tokio::test]
async fn benign_text_is_stored_without_notification() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        post(
            "/api/analyze/text",
            json!({"text": "Hello, how are you?", "user_id": "alice"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["is_toxic"], false);
    assert_eq!(body["result"]["language"], "en");
    assert!(body["notification"].is_null());
    assert_eq!(harness.mail.count(), 0);
}

#[tokio::test]
async fn empty_text_is_bad_request() {
    let harness = Harness::new();
    let (status, body) = send(
        harness.router(),
        post("/api/analyze/text", json!({"text": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn deepfake_with_user_sends_media_misuse() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        post(
            "/api/analyze/deepfake",
            json!({"path": "/uploads/fake_01.jpg", "user_id": "carol"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["is_deepfake"], true);
    let events = harness.mail.events.lock().unwrap();
    assert_eq!(events[0].kind().as_str(), "media_misuse");
    assert_eq!(events[0].payload()["type"], "deepfake");
    assert_eq!(
        events[0].payload()["details"],
        "Potential deepfake detected in your media."
    );
}

#[tokio::test]
async fn deepfake_without_user_stores_only() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        post("/api/analyze/deepfake", json!({"path": "/uploads/fake_01.jpg"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["notification"].is_null());
    assert_eq!(harness.mail.count(), 0);
    assert_eq!(harness.state.db.analysis_counts().await.unwrap(), (1, 1));
}

#[tokio::test]
async fn video_and_image_routes_return_records() {
    let harness = Harness::new();

    let (_, video) = send(
        harness.router(),
        post("/api/analyze/video", json!({"path": "/uploads/clip.mp4"})),
    )
    .await;
    assert_eq!(video["result"]["frame_analysis"].as_array().unwrap().len(), 30);

    let (_, image) = send(
        harness.router(),
        post("/api/analyze/image", json!({"path": "/uploads/nsfw_01.jpg", "user_id": "dan"})),
    )
    .await;
    assert_eq!(image["result"]["is_explicit"], true);
    assert_eq!(harness.mail.count(), 1);

    let (status, _) = send(
        harness.router(),
        post("/api/analyze/image", json!({"path": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn face_routes_return_records() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        post(
            "/api/verify/face",
            json!({"image1": "/id/match_a.jpg", "image2": "/id/match_b.jpg"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["match"], true);

    let (status, body) = send(
        harness.router(),
        post("/api/extract/face", json!({"path": "/id/noface.jpg"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["success"], false);
    assert!(body["result"]["error"].is_string());
}

#[tokio::test]
async fn profile_route_verifies_and_flags_mismatch() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        post(
            "/api/verify/profile",
            json!({"profile_image": "/p/profile.jpg", "reference_image": "/p/selfie.jpg"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["verified"], false);
    assert_eq!(body["result"]["profile_image"], "/p/profile.jpg");
    assert_eq!(harness.state.db.analysis_counts().await.unwrap(), (1, 1));

    let (status, _) = send(
        harness.router(),
        post("/api/verify/profile", json!({"profile_image": "/p/a.jpg", "reference_image": " "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analyses_lists_newest_first_with_limit() {
    let harness = Harness::new();
    for path in ["/u/a.jpg", "/u/b.jpg", "/u/c.jpg"] {
        send(
            harness.router(),
            post("/api/analyze/deepfake", json!({"path": path})),
        )
        .await;
    }

    let (status, body) = send(harness.router(), get("/api/analyses?limit=2")).await;

    assert_eq!(status, StatusCode::OK);
    let analyses = body["analyses"].as_array().unwrap();
    assert_eq!(analyses.len(), 2);
    assert_eq!(analyses[0]["subject"], "/u/c.jpg");
    assert_eq!(analyses[0]["kind"], "deepfake_image");
}

// ============================================================
// Review workflow
// ============================================================

async fn flagged_analysis(harness: &Harness) -> i64 {
    let (_, body) = send(
        harness.router(),
        post("/api/analyze/deepfake", json!({"path": "/u/fake.jpg"})),
    )
    .await;
    body["analysis_id"].as_i64().unwrap()
}

#[tokio::test]
async fn new_analyses_start_pending_with_content_hash() {
    let harness = Harness::new();
    flagged_analysis(&harness).await;

    let (_, body) = send(harness.router(), get("/api/analyses")).await;

    let stored = &body["analyses"][0];
    assert_eq!(stored["status"], "pending");
    let hash = stored["content_hash"].as_str().unwrap();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn review_status_moves_and_clears_pending_count() {
    let harness = Harness::new();
    let id = flagged_analysis(&harness).await;

    let (status, body) = send(
        harness.router(),
        patch(&format!("/api/analyses/{id}/status"), json!({"status": "reviewing"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": id, "status": "reviewing"}));

    let (_, listed) = send(harness.router(), get("/api/analyses")).await;
    assert_eq!(listed["analyses"][0]["status"], "reviewing");

    let (_, status_body) = send(harness.router(), get("/api/status")).await;
    assert_eq!(status_body["analyses"]["pending_flags"], 0);
    assert_eq!(status_body["analyses"]["flagged"], 1);
}

#[tokio::test]
async fn review_status_rejects_unknown_value() {
    let harness = Harness::new();
    let id = flagged_analysis(&harness).await;

    for bad in ["closed", "Pending", ""] {
        let (status, body) = send(
            harness.router(),
            patch(&format!("/api/analyses/{id}/status"), json!({"status": bad})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(
            body["error"],
            "Invalid status. Must be one of: pending, reviewing, resolved, dismissed"
        );
    }

    let (_, listed) = send(harness.router(), get("/api/analyses")).await;
    assert_eq!(listed["analyses"][0]["status"], "pending");
}

#[tokio::test]
async fn review_status_unknown_id_is_not_found() {
    let harness = Harness::new();

    let (status, body) = send(
        harness.router(),
        patch("/api/analyses/4242/status", json!({"status": "resolved"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

// ============================================================
// Users
// ============================================================

#[tokio::test]
async fn register_user_validates_and_stores() {
    let harness = Harness::new();

    let (status, _) = send(harness.router(), post("/api/users", json!({"id": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        harness.router(),
        post("/api/users", json!({"id": "erin", "email": "not-an-address"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        harness.router(),
        post(
            "/api/users",
            json!({"id": "erin", "email": "erin@example.com", "phone": "+15550003333"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], "erin");

    let stored = harness.state.db.get_user("erin").await.unwrap().unwrap();
    assert_eq!(stored.email.as_deref(), Some("erin@example.com"));
    assert_eq!(stored.phone.as_deref(), Some("+15550003333"));
}
