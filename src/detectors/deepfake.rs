// Deepfake detectors: filename-keyed mock and model-server backed.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::inference::{FrameScore, ImageScore, InferenceClient};
use super::traits::{DeepfakeAnalysis, DeepfakeDetector, FrameAnalysis, VideoAnalysis};

/// Manipulation scores above this mark an image or frame as a deepfake.
pub const DEEPFAKE_THRESHOLD: f64 = 0.5;

const MOCK_VIDEO_FRAMES: u32 = 30;

/// Canned answers keyed on the file name: `fake` → manipulated,
/// `noface` → no face found, anything else → authentic.
#[derive(Debug, Default, Clone)]
pub struct MockDeepfakeDetector;

impl MockDeepfakeDetector {
    fn authentic() -> DeepfakeAnalysis {
        DeepfakeAnalysis {
            is_deepfake: false,
            confidence: 0.95,
            facial_inconsistencies: Vec::new(),
            manipulation_score: 0.05,
            error: None,
        }
    }

    fn manipulated() -> DeepfakeAnalysis {
        DeepfakeAnalysis {
            is_deepfake: true,
            confidence: 0.85,
            facial_inconsistencies: vec!["eye_alignment".to_string(), "texture_mismatch".to_string()],
            manipulation_score: 0.92,
            error: None,
        }
    }
}

#[async_trait]
impl DeepfakeDetector for MockDeepfakeDetector {
    async fn analyze_image(&self, path: &Path) -> DeepfakeAnalysis {
        let name = path.to_string_lossy().to_lowercase();
        if name.contains("fake") {
            Self::manipulated()
        } else if name.contains("noface") {
            DeepfakeAnalysis::failed("No faces detected in image")
        } else {
            Self::authentic()
        }
    }

    async fn analyze_video(&self, _path: &Path) -> VideoAnalysis {
        let frame_analysis = (0..MOCK_VIDEO_FRAMES)
            .map(|frame_number| FrameAnalysis {
                frame_number,
                is_deepfake: false,
                confidence: 0.95,
                facial_inconsistencies: Vec::new(),
                manipulation_score: 0.05,
            })
            .collect();
        VideoAnalysis {
            is_deepfake: false,
            confidence: 0.95,
            frame_analysis,
            temporal_consistency: 0.98,
            error: None,
        }
    }
}

/// Deepfake detector backed by the model server.
pub struct ModelDeepfakeDetector {
    backend: Option<Arc<InferenceClient>>,
    load_error: Option<String>,
}

impl ModelDeepfakeDetector {
    pub fn new(backend: Arc<InferenceClient>) -> Self {
        Self {
            backend: Some(backend),
            load_error: None,
        }
    }

    /// A detector with no backend; every call reports `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: None,
            load_error: Some(reason.into()),
        }
    }

    fn missing_backend(&self) -> String {
        format!(
            "Deepfake model not available: {}",
            self.load_error.as_deref().unwrap_or("not loaded")
        )
    }
}

#[async_trait]
impl DeepfakeDetector for ModelDeepfakeDetector {
    async fn analyze_image(&self, path: &Path) -> DeepfakeAnalysis {
        let Some(backend) = &self.backend else {
            return DeepfakeAnalysis::failed(self.missing_backend());
        };
        match backend.deepfake_image(path).await {
            Ok(score) => image_analysis(score),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Deepfake image analysis failed");
                DeepfakeAnalysis::failed(e.to_string())
            }
        }
    }

    async fn analyze_video(&self, path: &Path) -> VideoAnalysis {
        let Some(backend) = &self.backend else {
            return VideoAnalysis::failed(self.missing_backend());
        };
        match backend.deepfake_video(path).await {
            Ok(frames) => video_analysis(&frames),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Deepfake video analysis failed");
                VideoAnalysis::failed(e.to_string())
            }
        }
    }

    fn is_available(&self) -> bool {
        self.backend.is_some()
    }
}

/// Confidence in whichever verdict the score implies.
fn verdict(score: f64) -> (bool, f64) {
    let is_deepfake = score > DEEPFAKE_THRESHOLD;
    let confidence = if is_deepfake { score } else { 1.0 - score };
    (is_deepfake, confidence)
}

fn image_analysis(score: ImageScore) -> DeepfakeAnalysis {
    if score.faces_detected == 0 {
        return DeepfakeAnalysis::failed("No faces detected in image");
    }
    let (is_deepfake, confidence) = verdict(score.manipulation_score);
    DeepfakeAnalysis {
        is_deepfake,
        confidence,
        facial_inconsistencies: score.inconsistencies,
        manipulation_score: score.manipulation_score,
        error: None,
    }
}

fn video_analysis(frames: &[FrameScore]) -> VideoAnalysis {
    if frames.is_empty() {
        return VideoAnalysis::failed("No frames could be analyzed");
    }

    let frame_analysis: Vec<FrameAnalysis> = frames
        .iter()
        .map(|f| {
            let (is_deepfake, confidence) = verdict(f.manipulation_score);
            FrameAnalysis {
                frame_number: f.frame_number,
                is_deepfake,
                confidence,
                facial_inconsistencies: Vec::new(),
                manipulation_score: f.manipulation_score,
            }
        })
        .collect();

    let mean = frames.iter().map(|f| f.manipulation_score).sum::<f64>() / frames.len() as f64;
    let (is_deepfake, confidence) = verdict(mean);

    VideoAnalysis {
        is_deepfake,
        confidence,
        frame_analysis,
        temporal_consistency: temporal_consistency(frames),
        error: None,
    }
}

/// 1 minus the mean absolute change in score between consecutive frames.
fn temporal_consistency(frames: &[FrameScore]) -> f64 {
    if frames.len() < 2 {
        return 1.0;
    }
    let total: f64 = frames
        .windows(2)
        .map(|w| (w[1].manipulation_score - w[0].manipulation_score).abs())
        .sum();
    (1.0 - total / (frames.len() - 1) as f64).clamp(0.0, 1.0)
}
