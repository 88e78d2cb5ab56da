// Classifier traits: the swap-ready abstraction behind moderation.
//
// A classifier returns a list of labelled scores, highest first. Real
// implementations live in onnx.rs (text) and vision.rs (images); the mock
// implementations here are deterministic and do no I/O.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const TOXIC_LABEL: &str = "toxic";
pub const NSFW_LABEL: &str = "nsfw";

/// One labelled score from a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Scores text for toxicity.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<Prediction>>;

    /// Score non-English text given its original form and its English
    /// translation. Model-backed classifiers only see the translation.
    async fn classify_translated(&self, _original: &str, translated: &str) -> Result<Vec<Prediction>> {
        self.classify(translated).await
    }
}

/// Scores an image file for explicit content.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, path: &Path) -> Result<Vec<Prediction>>;
}

/// Known toxic phrases for the mock text classifier, across the languages
/// the mock translator covers.
const MOCK_TOXIC_PHRASES: [&str; 11] = [
    "hateful message",
    "offensive content",
    "hate speech",
    "racist comment",
    "discriminatory language",
    "mensaje de odio",
    "contenu offensant",
    "嫌なメッセージ",
    "これは嫌なメッセージです",
    "este es un mensaje de odio",
    "c'est un message de haine",
];

/// Mock text classifier: a fixed phrase table.
/// Phrase present → `toxic 0.95`, otherwise `toxic 0.02`. Translated text
/// is checked in both forms, so a phrase in either one counts.
#[derive(Debug, Default, Clone)]
pub struct PhraseTextClassifier;

impl PhraseTextClassifier {
    fn score(text: &str) -> f64 {
        let lower = text.to_lowercase();
        let hit = MOCK_TOXIC_PHRASES.iter().any(|p| lower.contains(&p.to_lowercase()));
        if hit {
            0.95
        } else {
            0.02
        }
    }
}

#[async_trait]
impl TextClassifier for PhraseTextClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<Prediction>> {
        Ok(vec![Prediction::new(TOXIC_LABEL, Self::score(text))])
    }

    async fn classify_translated(&self, original: &str, translated: &str) -> Result<Vec<Prediction>> {
        let score = Self::score(original).max(Self::score(translated));
        Ok(vec![Prediction::new(TOXIC_LABEL, score)])
    }
}

/// Classifier that always answers with the same predictions.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    predictions: Vec<Prediction>,
}

impl FixedClassifier {
    pub fn new(predictions: Vec<Prediction>) -> Self {
        Self { predictions }
    }
}

#[async_trait]
impl TextClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<Prediction>> {
        Ok(self.predictions.clone())
    }
}

#[async_trait]
impl ImageClassifier for FixedClassifier {
    async fn classify(&self, _path: &Path) -> Result<Vec<Prediction>> {
        Ok(self.predictions.clone())
    }
}

/// Mock image classifier keyed on the file name.
/// `nsfw` or `explicit` in the path → `nsfw 0.9`; anything else is safe.
#[derive(Debug, Default, Clone)]
pub struct MarkerImageClassifier;

#[async_trait]
impl ImageClassifier for MarkerImageClassifier {
    async fn classify(&self, path: &Path) -> Result<Vec<Prediction>> {
        let name = path.to_string_lossy().to_lowercase();
        if name.contains("nsfw") || name.contains("explicit") {
            Ok(vec![
                Prediction::new(NSFW_LABEL, 0.9),
                Prediction::new("normal", 0.1),
            ])
        } else {
            Ok(vec![
                Prediction::new("normal", 0.97),
                Prediction::new(NSFW_LABEL, 0.03),
            ])
        }
    }
}

/// Sort predictions highest score first.
pub fn sort_predictions(predictions: &mut [Prediction]) {
    predictions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
