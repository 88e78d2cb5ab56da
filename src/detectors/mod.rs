// Detectors: deepfake analysis, face verification and content moderation
// bundled behind one suite.
//
// The suite is built once at startup. Mock or real variants are chosen then
// and never switched afterwards. A real detector whose backend can't be
// reached is either replaced by its mock (DEEPSHIELD_FALLBACK_TO_MOCK) or
// kept in an unavailable state that answers every call with an error record.

pub mod deepfake;
pub mod face;
pub mod inference;
pub mod traits;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Config, DetectorMode};
use crate::moderation::{ContentModerator, ImageModeration, TextModeration};
use deepfake::{MockDeepfakeDetector, ModelDeepfakeDetector};
use face::{MockFaceVerifier, ModelFaceVerifier};
use inference::InferenceClient;
pub use traits::{
    DeepfakeAnalysis, DeepfakeDetector, FaceExtraction, FaceMatch, FaceVerifier,
    ProfileVerification, VideoAnalysis,
};

pub struct DetectorSuite {
    mode: DetectorMode,
    deepfake: Arc<dyn DeepfakeDetector>,
    faces: Arc<dyn FaceVerifier>,
    moderator: Arc<ContentModerator>,
}

impl DetectorSuite {
    pub fn new(
        mode: DetectorMode,
        deepfake: Arc<dyn DeepfakeDetector>,
        faces: Arc<dyn FaceVerifier>,
        moderator: Arc<ContentModerator>,
    ) -> Self {
        Self {
            mode,
            deepfake,
            faces,
            moderator,
        }
    }

    /// All-mock suite. Deterministic and offline.
    pub fn mock() -> Self {
        Self::new(
            DetectorMode::Mock,
            Arc::new(MockDeepfakeDetector),
            Arc::new(MockFaceVerifier),
            Arc::new(ContentModerator::mock()),
        )
    }

    /// Build the suite the configuration asks for. Never fails.
    pub async fn from_config(config: &Config) -> Self {
        let moderator = Arc::new(ContentModerator::from_config(config));

        if config.detector_mode == DetectorMode::Mock {
            info!("Using mock detectors");
            return Self::new(
                DetectorMode::Mock,
                Arc::new(MockDeepfakeDetector),
                Arc::new(MockFaceVerifier),
                moderator,
            );
        }

        let (deepfake, faces): (Arc<dyn DeepfakeDetector>, Arc<dyn FaceVerifier>) =
            match connect_model_server(config).await {
                Ok(client) => {
                    info!(url = client.base_url(), "Connected to model server");
                    (
                        Arc::new(ModelDeepfakeDetector::new(Arc::clone(&client))),
                        Arc::new(ModelFaceVerifier::new(client)),
                    )
                }
                Err(reason) if config.fallback_to_mock => {
                    warn!(reason = %reason, "Model server unavailable, falling back to mock detectors");
                    (Arc::new(MockDeepfakeDetector), Arc::new(MockFaceVerifier))
                }
                Err(reason) => {
                    warn!(reason = %reason, "Model server unavailable, detectors will report errors");
                    (
                        Arc::new(ModelDeepfakeDetector::unavailable(reason.clone())),
                        Arc::new(ModelFaceVerifier::unavailable(reason)),
                    )
                }
            };

        Self::new(DetectorMode::Real, deepfake, faces, moderator)
    }

    pub fn mode(&self) -> DetectorMode {
        self.mode
    }

    pub fn moderator(&self) -> &ContentModerator {
        &self.moderator
    }

    /// Whether every detector has a working backend.
    pub fn is_available(&self) -> bool {
        self.deepfake.is_available() && self.faces.is_available() && self.moderator.is_available()
    }

    /// Deepfake analysis of a still image.
    pub async fn analyze_image(&self, path: &Path) -> DeepfakeAnalysis {
        self.deepfake.analyze_image(path).await
    }

    pub async fn analyze_video(&self, path: &Path) -> VideoAnalysis {
        self.deepfake.analyze_video(path).await
    }

    pub async fn analyze_text(&self, text: &str, language: Option<&str>) -> TextModeration {
        self.moderator.analyze_text(text, language).await
    }

    /// Explicit-content check of an image.
    pub async fn moderate_image(&self, path: &Path) -> ImageModeration {
        self.moderator.analyze_image(path).await
    }

    pub async fn verify_faces(&self, image1: &Path, image2: &Path) -> FaceMatch {
        self.faces.verify_faces(image1, image2).await
    }

    pub async fn extract_face(&self, path: &Path) -> FaceExtraction {
        self.faces.extract_face(path).await
    }

    /// Check a profile picture against a reference photo of the account owner.
    pub async fn verify_profile_image(&self, profile: &Path, reference: &Path) -> ProfileVerification {
        ProfileVerification {
            result: self.faces.verify_faces(profile, reference).await,
            profile_image: profile.display().to_string(),
            reference_image: reference.display().to_string(),
        }
    }
}

async fn connect_model_server(config: &Config) -> Result<Arc<InferenceClient>, String> {
    let url = config
        .inference_url
        .as_deref()
        .ok_or_else(|| "INFERENCE_URL not set".to_string())?;
    let client = InferenceClient::new(url, config.transport_timeout).map_err(|e| e.to_string())?;
    client.health().await.map_err(|e| format!("{e:#}"))?;
    Ok(Arc::new(client))
}
