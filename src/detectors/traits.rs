// Detector traits and the records they return.
//
// Detectors never fail: a missing model, an unreadable file or an image with
// no face all come back as a record with `error` set. Callers check the
// error field instead of handling a Result.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeepfakeAnalysis {
    pub is_deepfake: bool,
    pub confidence: f64,
    pub facial_inconsistencies: Vec<String>,
    pub manipulation_score: f64,
    pub error: Option<String>,
}

impl DeepfakeAnalysis {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_deepfake: false,
            confidence: 0.0,
            facial_inconsistencies: Vec::new(),
            manipulation_score: 0.0,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameAnalysis {
    pub frame_number: u32,
    pub is_deepfake: bool,
    pub confidence: f64,
    pub facial_inconsistencies: Vec<String>,
    pub manipulation_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoAnalysis {
    pub is_deepfake: bool,
    pub confidence: f64,
    pub frame_analysis: Vec<FrameAnalysis>,
    /// 1.0 when per-frame scores agree perfectly
    pub temporal_consistency: f64,
    pub error: Option<String>,
}

impl VideoAnalysis {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_deepfake: false,
            confidence: 0.0,
            frame_analysis: Vec::new(),
            temporal_consistency: 0.0,
            error: Some(error.into()),
        }
    }
}

/// Location of one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    /// `[x, y, width, height]` in pixels
    pub bbox: [i32; 4],
    /// Named facial landmarks, e.g. `left_eye` → `[x, y]`
    pub landmarks: BTreeMap<String, [i32; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacePair {
    pub image1: FaceData,
    pub image2: FaceData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceMatch {
    #[serde(rename = "match")]
    pub matched: bool,
    pub similarity: f64,
    pub confidence: f64,
    /// KYC verdict: the comparison completed and the faces matched
    pub verified: bool,
    pub face_match: bool,
    /// A face was found in the ID document (first image)
    pub id_valid: bool,
    pub face_data: Option<FacePair>,
    pub error: Option<String>,
}

impl FaceMatch {
    /// A completed comparison of two detected faces.
    pub fn compared(matched: bool, similarity: f64, faces: FacePair) -> Self {
        Self {
            matched,
            similarity,
            confidence: similarity,
            verified: matched,
            face_match: matched,
            id_valid: true,
            face_data: Some(faces),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            matched: false,
            similarity: 0.0,
            confidence: 0.0,
            verified: false,
            face_match: false,
            id_valid: false,
            face_data: None,
            error: Some(error.into()),
        }
    }
}

/// A profile picture checked against a trusted reference photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileVerification {
    #[serde(flatten)]
    pub result: FaceMatch,
    pub profile_image: String,
    pub reference_image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceExtraction {
    pub success: bool,
    pub face_data: Option<FaceData>,
    pub error: Option<String>,
}

impl FaceExtraction {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            face_data: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait DeepfakeDetector: Send + Sync {
    async fn analyze_image(&self, path: &Path) -> DeepfakeAnalysis;
    async fn analyze_video(&self, path: &Path) -> VideoAnalysis;
    /// False when the backing model could not be reached at construction.
    fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
pub trait FaceVerifier: Send + Sync {
    async fn verify_faces(&self, image1: &Path, image2: &Path) -> FaceMatch;
    async fn extract_face(&self, path: &Path) -> FaceExtraction;
    fn is_available(&self) -> bool {
        true
    }
}
