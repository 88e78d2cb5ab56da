// SQLite storage through the Database trait.
//
// Every test gets its own in-memory database, so they can run in parallel.

use std::sync::Arc;

use deepshield::db::models::{AnalysisKind, NewAnalysis, ReviewStatus, UserRecord};
use deepshield::db::{open_in_memory, Database};

fn db() -> Arc<dyn Database> {
    open_in_memory().expect("in-memory database")
}

fn user(id: &str, email: Option<&str>, phone: Option<&str>) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        email: email.map(String::from),
        phone: phone.map(String::from),
        display_name: None,
        created_at: String::new(),
    }
}

fn analysis(kind: AnalysisKind, flagged: bool, confidence: f64) -> NewAnalysis {
    NewAnalysis {
        user_id: Some("alice".to_string()),
        kind,
        subject: "/uploads/photo.jpg".to_string(),
        flagged,
        confidence,
        result_json: format!(r#"{{"confidence":{confidence}}}"#),
    }
}

#[tokio::test]
async fn schema_has_four_tables() {
    let db = db();
    assert_eq!(db.table_count().await.unwrap(), 4);
}

#[tokio::test]
async fn upsert_user_creates_then_updates() {
    let db = db();

    db.upsert_user(&user("alice", Some("alice@example.com"), None))
        .await
        .unwrap();
    db.upsert_user(&user("alice", Some("alice@new.example"), Some("+15550001111")))
        .await
        .unwrap();
    db.upsert_user(&user("bob", None, Some("+15550002222")))
        .await
        .unwrap();

    let alice = db.get_user("alice").await.unwrap().expect("alice stored");
    assert_eq!(alice.email.as_deref(), Some("alice@new.example"));
    assert_eq!(alice.phone.as_deref(), Some("+15550001111"));
    assert!(!alice.created_at.is_empty());

    assert_eq!(db.user_count().await.unwrap(), 2);
    assert!(db.get_user("carol").await.unwrap().is_none());
}

#[tokio::test]
async fn analyses_come_back_newest_first_with_parsed_result() {
    let db = db();

    let first = db
        .insert_analysis(&analysis(AnalysisKind::DeepfakeImage, true, 0.85))
        .await
        .unwrap();
    let second = db
        .insert_analysis(&analysis(AnalysisKind::Text, false, 0.02))
        .await
        .unwrap();
    assert!(second > first);

    let recent = db.get_recent_analyses(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, second);
    assert_eq!(recent[0].kind, "text");
    assert_eq!(recent[1].kind, "deepfake_image");
    assert!(recent[1].flagged);
    assert_eq!(recent[1].user_id.as_deref(), Some("alice"));
    assert_eq!(recent[1].result["confidence"], 0.85);

    let limited = db.get_recent_analyses(1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn analysis_counts_on_empty_database_are_zero() {
    let db = db();
    assert_eq!(db.analysis_counts().await.unwrap(), (0, 0));

    db.insert_analysis(&analysis(AnalysisKind::Image, true, 0.9))
        .await
        .unwrap();
    db.insert_analysis(&analysis(AnalysisKind::FaceVerification, false, 0.95))
        .await
        .unwrap();
    assert_eq!(db.analysis_counts().await.unwrap(), (2, 1));
}

#[tokio::test]
async fn review_status_round_trip_and_pending_flags() {
    let db = db();
    let flagged = db
        .insert_analysis(&analysis(AnalysisKind::Text, true, 0.95))
        .await
        .unwrap();
    db.insert_analysis(&analysis(AnalysisKind::Text, false, 0.02))
        .await
        .unwrap();
    assert_eq!(db.pending_flag_count().await.unwrap(), 1);

    assert!(db
        .update_analysis_status(flagged, ReviewStatus::Dismissed)
        .await
        .unwrap());
    assert_eq!(db.pending_flag_count().await.unwrap(), 0);

    let recent = db.get_recent_analyses(10).await.unwrap();
    let stored = recent.iter().find(|a| a.id == flagged).unwrap();
    assert_eq!(stored.status, "dismissed");
    assert!(stored.content_hash.is_some());

    assert!(!db
        .update_analysis_status(flagged + 100, ReviewStatus::Resolved)
        .await
        .unwrap());
}

#[tokio::test]
async fn notifications_store_channel_map() {
    let db = db();

    db.record_notification(
        "alice",
        "flagged_content",
        r#"{"mail":true,"short_message":false,"persistent_stream":false}"#,
    )
    .await
    .unwrap();
    db.record_notification("bob", "media_misuse", r#"{"mail":false}"#)
        .await
        .unwrap();

    let recent = db.get_recent_notifications(10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].user_id, "bob");
    assert_eq!(recent[1].kind, "flagged_content");
    assert_eq!(recent[1].channels["mail"], true);
    assert_eq!(recent[1].channels["short_message"], false);
}

#[tokio::test]
async fn initialize_creates_file_and_reopens() {
    let dir = std::env::temp_dir().join(format!("deepshield-test-{}", std::process::id()));
    let path = dir.join("nested").join("test.db");
    let path_str = path.to_string_lossy().to_string();

    {
        let db = deepshield::db::initialize_sqlite(&path_str).unwrap();
        db.upsert_user(&user("alice", Some("alice@example.com"), None))
            .await
            .unwrap();
    }
    assert!(path.exists());

    let reopened = deepshield::db::open_sqlite(&path_str).unwrap();
    assert_eq!(reopened.user_count().await.unwrap(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn open_missing_database_fails() {
    let err = match deepshield::db::open_sqlite("/nonexistent/deepshield/none.db") {
        Ok(_) => panic!("opening a missing database should fail"),
        Err(e) => e.to_string(),
    };
    assert!(err.contains("deepshield init"));
}
