// HTTP client for the model server behind the real detectors.
//
// The server hosts the deepfake classifier and the face embedding model.
// Files are sent base64-encoded in a JSON body; the server answers with raw
// scores and the detectors turn those into records.
//
//   GET  /health
//   POST /v1/deepfake/image  {"image": b64} → {manipulation_score, faces_detected, inconsistencies}
//   POST /v1/deepfake/video  {"video": b64} → {frames: [{frame_number, manipulation_score, faces_detected}]}
//   POST /v1/faces/embed     {"image": b64} → {faces: [{bbox, landmarks, embedding}]}

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct ImageScore {
    pub manipulation_score: f64,
    pub faces_detected: u32,
    #[serde(default)]
    pub inconsistencies: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameScore {
    pub frame_number: u32,
    pub manipulation_score: f64,
    #[serde(default)]
    pub faces_detected: u32,
}

#[derive(Debug, Deserialize)]
struct VideoScores {
    frames: Vec<FrameScore>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedFace {
    pub bbox: [i32; 4],
    #[serde(default)]
    pub landmarks: BTreeMap<String, [i32; 2]>,
    pub embedding: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct FaceEmbeddings {
    faces: Vec<EmbeddedFace>,
}

pub struct InferenceClient {
    client: Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build model server HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the model server is up.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Model server unreachable at {}", self.base_url))?;
        if !response.status().is_success() {
            anyhow::bail!("Model server health check returned {}", response.status());
        }
        Ok(())
    }

    pub async fn deepfake_image(&self, path: &Path) -> Result<ImageScore> {
        let content = encode_file(path).await?;
        self.post("/v1/deepfake/image", json!({ "image": content })).await
    }

    pub async fn deepfake_video(&self, path: &Path) -> Result<Vec<FrameScore>> {
        let content = encode_file(path).await?;
        let scores: VideoScores = self.post("/v1/deepfake/video", json!({ "video": content })).await?;
        Ok(scores.frames)
    }

    pub async fn embed_faces(&self, path: &Path) -> Result<Vec<EmbeddedFace>> {
        let content = encode_file(path).await?;
        let faces: FaceEmbeddings = self.post("/v1/faces/embed", json!({ "image": content })).await?;
        Ok(faces.faces)
    }

    async fn post<T: DeserializeOwned>(&self, route: &str, body: serde_json::Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, route);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to call model server {}", route))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Model server {} returned {}: {}", route, status, body);
        }

        debug!(route, "Model server responded");
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse model server response from {}", route))
    }
}

async fn encode_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}
