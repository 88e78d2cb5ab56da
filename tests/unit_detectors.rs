// Detector suite: mock determinism and construction from configuration.

use std::path::Path;

use deepshield::config::{Config, DetectorMode};
use deepshield::detectors::DetectorSuite;

// ============================================================
// Mock deepfake detector
// ============================================================

#[tokio::test]
async fn mock_deepfake_keys_on_file_name() {
    let suite = DetectorSuite::mock();

    let fake = suite.analyze_image(Path::new("/uploads/deepfake_01.jpg")).await;
    assert!(fake.is_deepfake);
    assert_eq!(fake.manipulation_score, 0.92);
    assert_eq!(fake.facial_inconsistencies.len(), 2);
    assert!(fake.error.is_none());

    let real = suite.analyze_image(Path::new("/uploads/portrait.jpg")).await;
    assert!(!real.is_deepfake);
    assert_eq!(real.confidence, 0.95);
    assert!(real.facial_inconsistencies.is_empty());

    let none = suite.analyze_image(Path::new("/uploads/noface_landscape.jpg")).await;
    assert!(!none.is_deepfake);
    assert_eq!(none.error.as_deref(), Some("No faces detected in image"));
}

#[tokio::test]
async fn mock_video_has_thirty_consistent_frames() {
    let suite = DetectorSuite::mock();

    let video = suite.analyze_video(Path::new("/uploads/clip.mp4")).await;

    assert!(!video.is_deepfake);
    assert_eq!(video.frame_analysis.len(), 30);
    assert_eq!(video.temporal_consistency, 0.98);
    let numbers: Vec<u32> = video.frame_analysis.iter().map(|f| f.frame_number).collect();
    assert_eq!(numbers, (0..30).collect::<Vec<_>>());
}

#[tokio::test]
async fn mock_answers_are_repeatable() {
    let suite = DetectorSuite::mock();
    let path = Path::new("/uploads/fake_face.png");

    let first = suite.analyze_image(path).await;
    let second = suite.analyze_image(path).await;
    assert_eq!(first, second);
}

// ============================================================
// Mock face verifier
// ============================================================

#[tokio::test]
async fn mock_face_match_and_no_match() {
    let suite = DetectorSuite::mock();

    let same = suite
        .verify_faces(Path::new("/id/match_a.jpg"), Path::new("/id/match_b.jpg"))
        .await;
    assert!(same.matched);
    assert_eq!(same.similarity, 0.95);
    assert!(same.face_data.is_some());

    let different = suite
        .verify_faces(Path::new("/id/alice.jpg"), Path::new("/id/bob.jpg"))
        .await;
    assert!(!different.matched);
    assert_eq!(different.similarity, 0.15);
    assert_eq!(different.confidence, different.similarity);
    let pair = different.face_data.unwrap();
    assert_ne!(pair.image1.landmarks, pair.image2.landmarks);
}

#[tokio::test]
async fn mock_face_missing_face_is_error() {
    let suite = DetectorSuite::mock();

    let result = suite
        .verify_faces(Path::new("/id/noface.jpg"), Path::new("/id/match.jpg"))
        .await;
    assert!(!result.matched);
    assert!(result.face_data.is_none());
    assert!(result.error.is_some());

    let extraction = suite.extract_face(Path::new("/id/noface.jpg")).await;
    assert!(!extraction.success);
    assert!(extraction.face_data.is_none());
}

#[tokio::test]
async fn mock_extract_face_returns_box_and_landmarks() {
    let suite = DetectorSuite::mock();

    let extraction = suite.extract_face(Path::new("/id/selfie.jpg")).await;

    assert!(extraction.success);
    let face = extraction.face_data.unwrap();
    assert_eq!(face.bbox, [0, 0, 100, 100]);
    assert_eq!(face.landmarks.get("left_eye"), Some(&[30, 30]));
}

#[tokio::test]
async fn mock_face_match_carries_kyc_verdict() {
    let suite = DetectorSuite::mock();

    let kyc = suite
        .verify_faces(Path::new("/kyc/match_id_card.jpg"), Path::new("/kyc/match_selfie.jpg"))
        .await;
    assert!(kyc.verified);
    assert!(kyc.face_match);
    assert!(kyc.id_valid);
    assert_eq!(kyc.confidence, 0.95);

    let mismatch = suite
        .verify_faces(Path::new("/kyc/id_card.jpg"), Path::new("/kyc/selfie.jpg"))
        .await;
    assert!(!mismatch.verified);
    assert!(!mismatch.face_match);
    assert!(mismatch.id_valid);

    let no_face = suite
        .verify_faces(Path::new("/kyc/noface_card.jpg"), Path::new("/kyc/selfie.jpg"))
        .await;
    assert!(!no_face.verified);
    assert!(!no_face.id_valid);
}

#[tokio::test]
async fn profile_image_verification_echoes_paths() {
    let suite = DetectorSuite::mock();

    let profile = suite
        .verify_profile_image(Path::new("/p/match_profile.jpg"), Path::new("/p/match_ref.jpg"))
        .await;

    assert!(profile.result.verified);
    assert_eq!(profile.profile_image, "/p/match_profile.jpg");
    assert_eq!(profile.reference_image, "/p/match_ref.jpg");

    let json = serde_json::to_value(&profile).unwrap();
    assert_eq!(json["match"], true);
    assert_eq!(json["verified"], true);
    assert_eq!(json["confidence"], 0.95);
    assert_eq!(json["reference_image"], "/p/match_ref.jpg");
}

#[tokio::test]
async fn face_match_serializes_match_key() {
    let suite = DetectorSuite::mock();
    let result = suite
        .verify_faces(Path::new("/id/match_a.jpg"), Path::new("/id/match_b.jpg"))
        .await;

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["match"], true);
    assert!(json.get("matched").is_none());
    for key in ["verified", "face_match", "id_valid"] {
        assert_eq!(json[key], true, "{key}");
    }
}

// ============================================================
// Construction from configuration
// ============================================================

#[tokio::test]
async fn mock_mode_builds_available_suite() {
    let suite = DetectorSuite::from_config(&Config::for_tests()).await;

    assert_eq!(suite.mode(), DetectorMode::Mock);
    assert!(suite.is_available());
    assert!(suite.moderator().load_error().is_none());
}

#[tokio::test]
async fn real_mode_without_backends_falls_back_to_mock() {
    let mut config = Config::for_tests();
    config.detector_mode = DetectorMode::Real;
    config.fallback_to_mock = true;

    let suite = DetectorSuite::from_config(&config).await;

    assert_eq!(suite.mode(), DetectorMode::Real);
    assert!(suite.is_available());
    let fake = suite.analyze_image(Path::new("/uploads/fake.jpg")).await;
    assert!(fake.is_deepfake);
}

#[tokio::test]
async fn real_mode_without_fallback_reports_errors() {
    let mut config = Config::for_tests();
    config.detector_mode = DetectorMode::Real;
    config.fallback_to_mock = false;

    let suite = DetectorSuite::from_config(&config).await;

    assert!(!suite.is_available());

    let image = suite.analyze_image(Path::new("/uploads/fake.jpg")).await;
    assert!(!image.is_deepfake);
    let error = image.error.unwrap();
    assert!(error.contains("Deepfake model not available"), "{error}");
    assert!(error.contains("INFERENCE_URL"), "{error}");

    let faces = suite
        .verify_faces(Path::new("/id/match_a.jpg"), Path::new("/id/match_b.jpg"))
        .await;
    assert!(!faces.matched);
    assert!(faces.error.is_some());

    let text = suite.analyze_text("a friendly note", Some("en")).await;
    assert!(!text.is_toxic);
    assert!(text.error.is_some());

    let explicit = suite.moderate_image(Path::new("/uploads/nsfw.jpg")).await;
    assert!(!explicit.is_explicit);
    assert!(explicit.error.unwrap().contains("VISION_API_KEY"));
}

#[tokio::test]
async fn unreachable_model_server_is_unavailable() {
    let mut config = Config::for_tests();
    config.detector_mode = DetectorMode::Real;
    config.fallback_to_mock = false;
    config.inference_url = Some("http://127.0.0.1:1".to_string());

    let suite = DetectorSuite::from_config(&config).await;

    let video = suite.analyze_video(Path::new("/uploads/clip.mp4")).await;
    assert!(video.frame_analysis.is_empty());
    assert!(video.error.is_some());
}
