// Google Cloud Vision SafeSearch image classifier.
//
// Vision answers with likelihood buckets rather than scores. We map each
// bucket onto [0, 1] and report `nsfw` as the worse of the adult and racy
// annotations.
//
// API docs: https://cloud.google.com/vision/docs/detecting-safe-search

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::{sort_predictions, ImageClassifier, Prediction, NSFW_LABEL};
use super::rate_limiter::RateLimiter;

const ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

pub struct SafeSearchClassifier {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl SafeSearchClassifier {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build vision HTTP client")?;
        Ok(Self {
            client,
            api_key,
            rate_limiter: RateLimiter::new(10.0),
        })
    }
}

#[async_trait]
impl ImageClassifier for SafeSearchClassifier {
    async fn classify(&self, path: &Path) -> Result<Vec<Prediction>> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;

        let request = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: base64::engine::general_purpose::STANDARD.encode(&bytes),
                },
                features: vec![Feature {
                    kind: "SAFE_SEARCH_DETECTION",
                }],
            }],
        };

        self.rate_limiter.acquire().await;

        let response = self
            .client
            .post(ANNOTATE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to call Vision API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Vision API returned {}: {}", status, body);
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .context("Failed to parse Vision API response")?;

        let annotation = parsed
            .responses
            .into_iter()
            .next()
            .context("Vision API returned no responses")?;

        if let Some(err) = annotation.error {
            anyhow::bail!("Vision API error: {}", err.message);
        }
        let safe = annotation
            .safe_search_annotation
            .context("Vision API returned no SafeSearch annotation")?;

        let predictions = safe_search_predictions(&safe);
        debug!(
            path = %path.display(),
            adult = %safe.adult,
            racy = %safe.racy,
            "SafeSearch classified image"
        );
        Ok(predictions)
    }
}

/// Map a SafeSearch likelihood bucket to a score.
fn likelihood_score(likelihood: &str) -> f64 {
    match likelihood {
        "VERY_UNLIKELY" => 0.0,
        "UNLIKELY" => 0.25,
        "POSSIBLE" => 0.5,
        "LIKELY" => 0.75,
        "VERY_LIKELY" => 1.0,
        _ => 0.0,
    }
}

fn safe_search_predictions(safe: &SafeSearchAnnotation) -> Vec<Prediction> {
    let adult = likelihood_score(&safe.adult);
    let racy = likelihood_score(&safe.racy);
    let nsfw = adult.max(racy);
    let mut predictions = vec![
        Prediction::new(NSFW_LABEL, nsfw),
        Prediction::new("normal", 1.0 - nsfw),
        Prediction::new("violence", likelihood_score(&safe.violence)),
        Prediction::new("medical", likelihood_score(&safe.medical)),
        Prediction::new("spoof", likelihood_score(&safe.spoof)),
    ];
    sort_predictions(&mut predictions);
    predictions
}

// --- Vision API request/response types ---

#[derive(Serialize)]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResult {
    safe_search_annotation: Option<SafeSearchAnnotation>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SafeSearchAnnotation {
    adult: String,
    spoof: String,
    medical: String,
    violence: String,
    racy: String,
}
