// Face verification: filename-keyed mock and embedding-based matcher.
//
// The model-backed verifier asks the model server for one embedding per
// image and compares them with cosine similarity.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::inference::{EmbeddedFace, InferenceClient};
use super::traits::{FaceData, FaceExtraction, FaceMatch, FacePair, FaceVerifier};

/// Embeddings at or above this cosine similarity belong to the same person.
pub const MATCH_THRESHOLD: f64 = 0.6;

const NO_FACE: &str = "No face detected in image";

fn mock_face(eye: i32) -> FaceData {
    FaceData {
        bbox: [0, 0, 100, 100],
        landmarks: BTreeMap::from([("left_eye".to_string(), [eye, eye])]),
    }
}

/// `noface` in either path → no face; `match` in both → same person;
/// anything else → different people.
#[derive(Debug, Default, Clone)]
pub struct MockFaceVerifier;

#[async_trait]
impl FaceVerifier for MockFaceVerifier {
    async fn verify_faces(&self, image1: &Path, image2: &Path) -> FaceMatch {
        let a = image1.to_string_lossy().to_lowercase();
        let b = image2.to_string_lossy().to_lowercase();

        if a.contains("noface") || b.contains("noface") {
            return FaceMatch::failed(NO_FACE);
        }
        if a.contains("match") && b.contains("match") {
            return FaceMatch::compared(
                true,
                0.95,
                FacePair {
                    image1: mock_face(30),
                    image2: mock_face(30),
                },
            );
        }
        FaceMatch::compared(
            false,
            0.15,
            FacePair {
                image1: mock_face(30),
                image2: mock_face(40),
            },
        )
    }

    async fn extract_face(&self, path: &Path) -> FaceExtraction {
        if path.to_string_lossy().to_lowercase().contains("noface") {
            return FaceExtraction::failed(NO_FACE);
        }
        FaceExtraction {
            success: true,
            face_data: Some(mock_face(30)),
            error: None,
        }
    }
}

pub struct ModelFaceVerifier {
    backend: Option<Arc<InferenceClient>>,
    load_error: Option<String>,
}

impl ModelFaceVerifier {
    pub fn new(backend: Arc<InferenceClient>) -> Self {
        Self {
            backend: Some(backend),
            load_error: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            backend: None,
            load_error: Some(reason.into()),
        }
    }

    fn missing_backend(&self) -> String {
        format!(
            "Face model not available: {}",
            self.load_error.as_deref().unwrap_or("not loaded")
        )
    }

    /// The most prominent face in an image: the one with the largest box.
    async fn primary_face(backend: &InferenceClient, path: &Path) -> Result<EmbeddedFace, String> {
        let faces = backend.embed_faces(path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Face embedding failed");
            e.to_string()
        })?;
        faces
            .into_iter()
            .max_by_key(|f| i64::from(f.bbox[2]) * i64::from(f.bbox[3]))
            .ok_or_else(|| NO_FACE.to_string())
    }
}

fn face_data(face: &EmbeddedFace) -> FaceData {
    FaceData {
        bbox: face.bbox,
        landmarks: face.landmarks.clone(),
    }
}

#[async_trait]
impl FaceVerifier for ModelFaceVerifier {
    async fn verify_faces(&self, image1: &Path, image2: &Path) -> FaceMatch {
        let Some(backend) = &self.backend else {
            return FaceMatch::failed(self.missing_backend());
        };

        let (a, b) = tokio::join!(
            Self::primary_face(backend, image1),
            Self::primary_face(backend, image2)
        );
        let (a, b) = match (a, b) {
            (Ok(a), Ok(b)) => (a, b),
            (Err(e), _) | (_, Err(e)) => return FaceMatch::failed(e),
        };

        let similarity = cosine_similarity(&a.embedding, &b.embedding);
        let matched = similarity >= MATCH_THRESHOLD;
        debug!(similarity, matched, "Compared face embeddings");

        FaceMatch::compared(
            matched,
            similarity,
            FacePair {
                image1: face_data(&a),
                image2: face_data(&b),
            },
        )
    }

    async fn extract_face(&self, path: &Path) -> FaceExtraction {
        let Some(backend) = &self.backend else {
            return FaceExtraction::failed(self.missing_backend());
        };
        match Self::primary_face(backend, path).await {
            Ok(face) => FaceExtraction {
                success: true,
                face_data: Some(face_data(&face)),
                error: None,
            },
            Err(e) => FaceExtraction::failed(e),
        }
    }

    fn is_available(&self) -> bool {
        self.backend.is_some()
    }
}

/// Cosine similarity clamped to [0, 1]. Mismatched or zero vectors score 0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(0.0, 1.0)
    }
}
