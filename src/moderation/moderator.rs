// ContentModerator: the text and image moderation pipeline.
//
// Text: language detection → keyword blacklist → translation to English →
// classifier, which is handed both the original and the translation. A
// blacklist hit settles the verdict on its own, so translation
// and classification are skipped for it. Every step that talks to the
// outside world is bounded by the configured timeout, and nothing here
// returns an error: failures land in the result's `error` field.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{Config, DetectorMode};

use super::blacklist::KeywordBlacklist;
use super::classifier::{
    ImageClassifier, MarkerImageClassifier, PhraseTextClassifier, TextClassifier, NSFW_LABEL,
    TOXIC_LABEL,
};
use super::onnx::OnnxTextClassifier;
use super::translation::{GoogleTranslator, MockTranslator, Translator};
use super::vision::SafeSearchClassifier;

/// Confidence reported for a keyword blacklist hit.
pub const BLACKLIST_CONFIDENCE: f64 = 0.95;
/// Classifier scores above this count as a positive verdict.
pub const FLAG_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextModeration {
    pub is_toxic: bool,
    pub confidence: f64,
    pub language: String,
    /// Blacklisted terms found in the text, in discovery order
    pub matched_terms: Vec<String>,
    /// English rendering used for classification; None for English input
    pub translated_text: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageModeration {
    pub is_explicit: bool,
    pub confidence: f64,
    pub error: Option<String>,
}

impl ImageModeration {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            is_explicit: false,
            confidence: 0.0,
            error: Some(error.into()),
        }
    }
}

pub struct ContentModerator {
    translator: Arc<dyn Translator>,
    blacklist: KeywordBlacklist,
    text_classifier: Option<Arc<dyn TextClassifier>>,
    image_classifier: Option<Arc<dyn ImageClassifier>>,
    /// Why a classifier is missing, reported back on every call that needs it
    load_error: Option<String>,
    timeout: Duration,
}

impl ContentModerator {
    pub fn new(
        translator: Arc<dyn Translator>,
        blacklist: KeywordBlacklist,
        text_classifier: Option<Arc<dyn TextClassifier>>,
        image_classifier: Option<Arc<dyn ImageClassifier>>,
        timeout: Duration,
    ) -> Self {
        Self {
            translator,
            blacklist,
            text_classifier,
            image_classifier,
            load_error: None,
            timeout,
        }
    }

    /// Deterministic moderator: mock translator, default blacklist, phrase
    /// and marker classifiers.
    pub fn mock() -> Self {
        Self::new(
            Arc::new(MockTranslator::default()),
            KeywordBlacklist::default(),
            Some(Arc::new(PhraseTextClassifier)),
            Some(Arc::new(MarkerImageClassifier)),
            Duration::from_secs(5),
        )
    }

    /// Build the moderator the configuration asks for. Never fails: a
    /// classifier that can't be loaded is either replaced by its mock
    /// (fallback enabled) or left unset with the reason recorded.
    pub fn from_config(config: &Config) -> Self {
        let mut blacklist = KeywordBlacklist::default();
        if let Some(path) = &config.blacklist_path {
            if let Err(e) = blacklist.load_file(path) {
                warn!(error = %e, "Keeping built-in blacklist");
            }
        }

        if config.detector_mode == DetectorMode::Mock {
            let mut moderator = Self::mock();
            moderator.blacklist = blacklist;
            moderator.timeout = config.transport_timeout;
            return moderator;
        }

        let translator: Arc<dyn Translator> = if config.translation_api_key.is_empty() {
            debug!("TRANSLATION_API_KEY not set, using table translator");
            Arc::new(MockTranslator::default())
        } else {
            match GoogleTranslator::new(config.translation_api_key.clone(), config.transport_timeout) {
                Ok(t) => Arc::new(t),
                Err(e) => {
                    warn!(error = %e, "Translation client unavailable, using table translator");
                    Arc::new(MockTranslator::default())
                }
            }
        };

        let mut errors = Vec::new();

        let text_classifier: Option<Arc<dyn TextClassifier>> =
            match OnnxTextClassifier::load(&config.model_dir) {
                Ok(c) => Some(Arc::new(c)),
                Err(e) if config.fallback_to_mock => {
                    warn!(error = %e, "Text classifier unavailable, falling back to mock");
                    Some(Arc::new(PhraseTextClassifier))
                }
                Err(e) => {
                    warn!(error = %e, "Text classifier unavailable");
                    errors.push(format!("text classifier: {e}"));
                    None
                }
            };

        let image_classifier: Option<Arc<dyn ImageClassifier>> = if config.vision_api_key.is_empty() {
            if config.fallback_to_mock {
                warn!("VISION_API_KEY not set, falling back to mock image classifier");
                Some(Arc::new(MarkerImageClassifier))
            } else {
                errors.push("image classifier: VISION_API_KEY not set".to_string());
                None
            }
        } else {
            match SafeSearchClassifier::new(config.vision_api_key.clone(), config.transport_timeout) {
                Ok(c) => Some(Arc::new(c)),
                Err(e) => {
                    errors.push(format!("image classifier: {e}"));
                    None
                }
            }
        };

        let mut moderator = Self::new(
            translator,
            blacklist,
            text_classifier,
            image_classifier,
            config.transport_timeout,
        );
        if !errors.is_empty() {
            moderator.load_error = Some(errors.join("; "));
        }
        moderator
    }

    pub fn blacklist(&self) -> &KeywordBlacklist {
        &self.blacklist
    }

    pub fn blacklist_mut(&mut self) -> &mut KeywordBlacklist {
        &mut self.blacklist
    }

    /// True when both classifiers are loaded.
    pub fn is_available(&self) -> bool {
        self.text_classifier.is_some() && self.image_classifier.is_some()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    fn unavailable_message(&self, what: &str) -> String {
        match &self.load_error {
            Some(e) => format!("{what} not available: {e}"),
            None => format!("{what} not available"),
        }
    }

    /// Moderate a piece of text. `language` skips detection when given.
    pub async fn analyze_text(&self, text: &str, language: Option<&str>) -> TextModeration {
        let language = match language.filter(|l| !l.trim().is_empty()) {
            Some(l) => l.to_string(),
            None => self.detect_language(text).await,
        };

        let mut result = TextModeration {
            is_toxic: false,
            confidence: 0.0,
            language: language.clone(),
            matched_terms: Vec::new(),
            translated_text: None,
            error: None,
        };

        let hit = self.blacklist.check(text, &language);
        debug!(language = %language, matched = ?hit.matched, supported = hit.supported, "Blacklist check");
        if hit.is_hit() {
            result.is_toxic = true;
            result.confidence = BLACKLIST_CONFIDENCE;
            result.matched_terms = hit.matched;
            // Skipped translation still reports the text that was judged
            if language != "en" {
                result.translated_text = Some(text.to_string());
            }
            return result;
        }

        if language != "en" {
            result.translated_text = Some(self.translate_to_english(text, &language).await);
        }

        let Some(classifier) = &self.text_classifier else {
            result.error = Some(self.unavailable_message("Text classifier"));
            return result;
        };

        let scored = match &result.translated_text {
            Some(translated) => classifier.classify_translated(text, translated),
            None => classifier.classify(text),
        };
        match tokio::time::timeout(self.timeout, scored).await {
            Ok(Ok(predictions)) => {
                if let Some(top) = predictions.first() {
                    result.is_toxic = top.label == TOXIC_LABEL && top.score > FLAG_THRESHOLD;
                    result.confidence = top.score;
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Text classifier failed");
                result.error = Some(e.to_string());
            }
            Err(_) => {
                warn!("Text classifier timed out");
                result.error = Some("Text classifier timed out".to_string());
            }
        }

        debug!(
            is_toxic = result.is_toxic,
            confidence = result.confidence,
            text_preview = %crate::output::truncate_chars(text, 50),
            "Moderated text"
        );
        result
    }

    /// Moderate an image file.
    pub async fn analyze_image(&self, path: &Path) -> ImageModeration {
        let Some(classifier) = &self.image_classifier else {
            return ImageModeration::failed(self.unavailable_message("Image classifier"));
        };

        let predictions = match tokio::time::timeout(self.timeout, classifier.classify(path)).await {
            Ok(Ok(p)) => p,
            Ok(Err(e)) => {
                warn!(path = %path.display(), error = %e, "Image classifier failed");
                return ImageModeration::failed(e.to_string());
            }
            Err(_) => return ImageModeration::failed("Image classifier timed out"),
        };

        let nsfw_scores = predictions
            .iter()
            .filter(|p| p.label == NSFW_LABEL)
            .map(|p| p.score);

        ImageModeration {
            is_explicit: nsfw_scores.clone().any(|s| s > FLAG_THRESHOLD),
            confidence: nsfw_scores.fold(0.0, f64::max),
            error: None,
        }
    }

    async fn detect_language(&self, text: &str) -> String {
        match tokio::time::timeout(self.timeout, self.translator.detect_language(text)).await {
            Ok(Ok(lang)) => lang,
            Ok(Err(e)) => {
                debug!(error = %e, "Language detection failed, assuming English");
                "en".to_string()
            }
            Err(_) => {
                debug!("Language detection timed out, assuming English");
                "en".to_string()
            }
        }
    }

    /// Translate into English, keeping the original text on failure.
    async fn translate_to_english(&self, text: &str, language: &str) -> String {
        match tokio::time::timeout(self.timeout, self.translator.translate(text, "en", Some(language))).await {
            Ok(Ok(translated)) => translated,
            Ok(Err(e)) => {
                debug!(language, error = %e, "Translation failed, classifying original text");
                text.to_string()
            }
            Err(_) => {
                debug!(language, "Translation timed out, classifying original text");
                text.to_string()
            }
        }
    }
}
