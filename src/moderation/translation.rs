// Language detection and translation.
//
// GoogleTranslator calls the Cloud Translation v2 REST API. MockTranslator
// answers from fixed tables and is used whenever no API key is configured,
// so the moderation pipeline works offline with the same fixtures every run.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::rate_limiter::RateLimiter;

const TRANSLATE_URL: &str = "https://translation.googleapis.com/language/translate/v2";

#[async_trait]
pub trait Translator: Send + Sync {
    /// Detect the language of `text`, as an ISO 639-1 tag.
    async fn detect_language(&self, text: &str) -> Result<String>;

    /// Translate `text` into `target`. `source` is a hint; None means auto-detect.
    async fn translate(&self, text: &str, target: &str, source: Option<&str>) -> Result<String>;
}

/// Google Cloud Translation v2 client.
pub struct GoogleTranslator {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl GoogleTranslator {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build translation HTTP client")?;
        Ok(Self {
            client,
            api_key,
            rate_limiter: RateLimiter::new(10.0),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn detect_language(&self, text: &str) -> Result<String> {
        self.rate_limiter.acquire().await;

        let response = self
            .client
            .post(format!("{TRANSLATE_URL}/detect"))
            .query(&[("key", self.api_key.as_str())])
            .form(&[("q", text)])
            .send()
            .await
            .context("Failed to call language detection API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Language detection returned {}: {}", status, body);
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .context("Failed to parse language detection response")?;

        parsed
            .data
            .detections
            .into_iter()
            .flatten()
            .next()
            .map(|d| d.language)
            .context("Language detection returned no candidates")
    }

    async fn translate(&self, text: &str, target: &str, source: Option<&str>) -> Result<String> {
        self.rate_limiter.acquire().await;

        let mut form = vec![("q", text), ("target", target), ("format", "text")];
        if let Some(source) = source {
            form.push(("source", source));
        }

        let response = self
            .client
            .post(TRANSLATE_URL)
            .query(&[("key", self.api_key.as_str())])
            .form(&form)
            .send()
            .await
            .context("Failed to call translation API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Translation API returned {}: {}", status, body);
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        let translated = parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .context("Translation API returned no translations")?;

        debug!(
            source = source.unwrap_or("auto"),
            target,
            text_preview = %crate::output::truncate_chars(text, 50),
            "Translated text"
        );
        Ok(translated)
    }
}

// --- Translation API response types ---

#[derive(Deserialize)]
struct DetectResponse {
    data: DetectData,
}

#[derive(Deserialize)]
struct DetectData {
    detections: Vec<Vec<Detection>>,
}

#[derive(Deserialize)]
struct Detection {
    language: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

/// Offline translator backed by fixed tables.
pub struct MockTranslator {
    detections: HashMap<&'static str, &'static str>,
    translations: HashMap<(&'static str, &'static str), &'static str>,
}

impl Default for MockTranslator {
    fn default() -> Self {
        let detections = HashMap::from([
            ("これは嫌なメッセージです", "ja"),
            ("Este es un mensaje de odio", "es"),
            ("C'est un message de haine", "fr"),
            ("Hello, how are you?", "en"),
            ("This is a hateful message", "en"),
            ("¿Hola, cómo estás?", "es"),
            ("Bonjour, comment allez-vous?", "fr"),
            ("こんにちは、元気ですか？", "ja"),
            ("Buenos días, ¿cómo estás?", "es"),
            ("Este contenido es ofensivo", "es"),
            ("Ce contenu est offensant", "fr"),
            ("안녕하세요", "ko"),
        ]);
        let translations = HashMap::from([
            (("ja", "これは嫌なメッセージです"), "This is an unpleasant message"),
            (("es", "Este es un mensaje de odio"), "This is a hateful message"),
            (("fr", "C'est un message de haine"), "This is a hateful message"),
            (("es", "¿Hola, cómo estás?"), "Hello, how are you?"),
            (("fr", "Bonjour, comment allez-vous?"), "Hello, how are you?"),
            (("ja", "こんにちは、元気ですか？"), "Hello, how are you?"),
        ]);
        Self {
            detections,
            translations,
        }
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn detect_language(&self, text: &str) -> Result<String> {
        self.detections
            .get(text)
            .map(|lang| lang.to_string())
            .with_context(|| format!("No mock language detection for {text:?}"))
    }

    async fn translate(&self, text: &str, target: &str, source: Option<&str>) -> Result<String> {
        let source = match source {
            Some(s) => s.to_string(),
            None => self.detect_language(text).await?,
        };
        if source == target {
            return Ok(text.to_string());
        }
        if target != "en" {
            anyhow::bail!("Mock translator only translates into English");
        }
        self.translations
            .get(&(source.as_str(), text))
            .map(|t| t.to_string())
            .with_context(|| format!("No mock translation for {text:?} ({source})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_detects_known_text() {
        let t = MockTranslator::default();
        assert_eq!(t.detect_language("Este es un mensaje de odio").await.unwrap(), "es");
        assert!(t.detect_language("completely unknown").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_translates_known_text() {
        let t = MockTranslator::default();
        let out = t
            .translate("C'est un message de haine", "en", Some("fr"))
            .await
            .unwrap();
        assert_eq!(out, "This is a hateful message");
    }

    #[tokio::test]
    async fn test_mock_same_language_is_identity() {
        let t = MockTranslator::default();
        let out = t.translate("Hello, how are you?", "en", None).await.unwrap();
        assert_eq!(out, "Hello, how are you?");
    }

    #[tokio::test]
    async fn test_mock_unknown_translation_fails() {
        let t = MockTranslator::default();
        assert!(t.translate("Ce contenu est offensant", "en", Some("fr")).await.is_err());
    }
}
