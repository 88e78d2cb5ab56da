// Local ONNX text classifier (unbiased-toxic-roberta).
//
// Runs entirely on the local CPU. The model emits one logit per label; we
// apply sigmoid to each and read label names from the model's config.json
// (`id2label`), so a different multi-label model can be dropped into the
// model directory without code changes.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::debug;

use super::classifier::{sort_predictions, Prediction, TextClassifier, TOXIC_LABEL};
use super::download::{LABELS_FILE, MODEL_FILE, TOKENIZER_FILE};

/// RoBERTa's maximum sequence length.
const MAX_TOKENS: usize = 512;

pub struct OnnxTextClassifier {
    // ort::Session::run takes &mut self and spawn_blocking needs 'static
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    labels: Arc<Vec<String>>,
}

#[derive(Deserialize)]
struct ModelConfig {
    id2label: BTreeMap<String, String>,
}

impl OnnxTextClassifier {
    /// Load the model, tokenizer and label config from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        let labels_path = model_dir.join(LABELS_FILE);

        for path in [&model_path, &tokenizer_path, &labels_path] {
            if !path.exists() {
                anyhow::bail!(
                    "Model file not found: {}\nRun `deepshield download-model` to download it.",
                    path.display()
                );
            }
        }

        let labels = read_labels(&labels_path)?;

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        debug!(labels = labels.len(), "Loaded ONNX text classifier from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            labels: Arc::new(labels),
        })
    }
}

#[async_trait]
impl TextClassifier for OnnxTextClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<Prediction>> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let labels = Arc::clone(&self.labels);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || {
            let encoding = tokenizer
                .encode(text.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

            let len = encoding.get_ids().len().min(MAX_TOKENS);
            let input_ids: Vec<i64> = encoding.get_ids()[..len].iter().map(|&id| id as i64).collect();
            let attention_mask: Vec<i64> = encoding.get_attention_mask()[..len]
                .iter()
                .map(|&m| m as i64)
                .collect();

            let shape = [1_i64, len as i64];
            let input_ids_tensor = Tensor::from_array((shape, input_ids))
                .context("Failed to create input_ids tensor")?;
            let attention_mask_tensor = Tensor::from_array((shape, attention_mask))
                .context("Failed to create attention_mask tensor")?;

            let logits = {
                let mut session = session
                    .lock()
                    .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

                let outputs = session
                    .run(ort::inputs! {
                        "input_ids" => input_ids_tensor,
                        "attention_mask" => attention_mask_tensor
                    })
                    .context("ONNX inference failed")?;

                let (_shape, data) = outputs[0]
                    .try_extract_tensor::<f32>()
                    .context("Failed to extract output tensor")?;
                data.to_vec()
            };

            let predictions = logits_to_predictions(&logits, &labels)?;

            debug!(
                top_label = predictions.first().map(|p| p.label.as_str()).unwrap_or(""),
                top_score = predictions.first().map(|p| p.score).unwrap_or(0.0),
                text_preview = %crate::output::truncate_chars(&text, 50),
                "ONNX classified text"
            );

            Ok(predictions)
        })
        .await
        .context("spawn_blocking panicked")?
    }
}

/// Read `id2label` from a HuggingFace config.json, ordered by index.
fn read_labels(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_labels(&raw).with_context(|| format!("Invalid label config in {}", path.display()))
}

fn parse_labels(raw: &str) -> Result<Vec<String>> {
    let config: ModelConfig = serde_json::from_str(raw)?;
    let mut indexed = config
        .id2label
        .into_iter()
        .map(|(idx, label)| {
            idx.parse::<usize>()
                .map(|i| (i, normalize_label(&label)))
                .map_err(|_| anyhow::anyhow!("Label index {idx:?} is not a number"))
        })
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|(i, _)| *i);
    if indexed.is_empty() {
        anyhow::bail!("id2label is empty");
    }
    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

/// The toxicity head is called "toxicity" in the model config; the
/// moderation pipeline keys on "toxic".
fn normalize_label(label: &str) -> String {
    match label {
        "toxicity" | "toxic" | "TOXIC" => TOXIC_LABEL.to_string(),
        other => other.to_string(),
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logits_to_predictions(logits: &[f32], labels: &[String]) -> Result<Vec<Prediction>> {
    if logits.len() != labels.len() {
        anyhow::bail!(
            "Model returned {} scores for {} labels",
            logits.len(),
            labels.len()
        );
    }
    let mut predictions: Vec<Prediction> = labels
        .iter()
        .zip(logits)
        .map(|(label, &logit)| Prediction::new(label.clone(), sigmoid(logit as f64)))
        .collect();
    sort_predictions(&mut predictions);
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for x in [0.5, 1.0, 2.0, 5.0] {
            assert!((sigmoid(x) + sigmoid(-x) - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_parse_labels_orders_by_index() {
        let raw = r#"{"id2label": {"2": "obscene", "0": "toxicity", "1": "severe_toxicity"}}"#;
        let labels = parse_labels(raw).unwrap();
        assert_eq!(labels, vec!["toxic", "severe_toxicity", "obscene"]);
    }

    #[test]
    fn test_parse_labels_rejects_empty() {
        assert!(parse_labels(r#"{"id2label": {}}"#).is_err());
    }

    #[test]
    fn test_logits_sorted_highest_first() {
        let labels = vec!["toxic".to_string(), "insult".to_string()];
        let preds = logits_to_predictions(&[-3.0, 2.0], &labels).unwrap();
        assert_eq!(preds[0].label, "insult");
        assert!(preds[0].score > 0.85);
        assert!(preds[1].score < 0.1);
    }

    #[test]
    fn test_logits_label_count_mismatch() {
        let labels = vec!["toxic".to_string()];
        assert!(logits_to_predictions(&[0.1, 0.2], &labels).is_err());
    }
}
