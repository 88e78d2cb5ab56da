use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Default Twilio-style SMS endpoint. `{account_sid}` is substituted at send time.
pub const DEFAULT_SMS_API_URL: &str =
    "https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Messages.json";

/// Default mail relay endpoint (SendGrid v3 mail/send format).
pub const DEFAULT_MAIL_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Which family of detector implementations to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorMode {
    /// Deterministic canned responses, no I/O
    Mock,
    /// Model-backed detectors (local ONNX, Google APIs, model server)
    Real,
}

impl DetectorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorMode::Mock => "mock",
            DetectorMode::Real => "real",
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub detector_mode: DetectorMode,
    /// Substitute mock detectors when a real one can't be loaded at startup
    pub fallback_to_mock: bool,
    pub db_path: String,
    /// Directory containing the ONNX text classifier files
    pub model_dir: PathBuf,
    /// Extra keyword blacklist (JSON object of language -> words)
    pub blacklist_path: Option<PathBuf>,
    /// Upper bound on every outbound call (mail, SMS, translation, vision, model server)
    pub transport_timeout: Duration,
    /// Base URL of the model server backing real deepfake and face detectors
    pub inference_url: Option<String>,
    pub translation_api_key: String,
    pub vision_api_key: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub from_email: String,
    pub sms_api_url: String,
    pub sms_account_sid: String,
    pub sms_auth_token: String,
    pub sms_from_number: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let detector_mode = if env_flag("DEEPSHIELD_TEST_MODE", false) {
            DetectorMode::Mock
        } else {
            DetectorMode::Real
        };

        let model_dir = env::var("DEEPSHIELD_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::moderation::download::default_model_dir());

        let timeout_secs = match env::var("DEEPSHIELD_TRANSPORT_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                anyhow::anyhow!("DEEPSHIELD_TRANSPORT_TIMEOUT_SECS must be a whole number, got {raw:?}")
            })?,
            Err(_) => 10,
        };

        Ok(Self {
            detector_mode,
            fallback_to_mock: env_flag("DEEPSHIELD_FALLBACK_TO_MOCK", true),
            db_path: env::var("DEEPSHIELD_DB_PATH").unwrap_or_else(|_| "./deepshield.db".to_string()),
            model_dir,
            blacklist_path: env::var("DEEPSHIELD_BLACKLIST_PATH").ok().map(PathBuf::from),
            transport_timeout: Duration::from_secs(timeout_secs.max(1)),
            inference_url: env::var("INFERENCE_URL").ok().filter(|u| !u.trim().is_empty()),
            translation_api_key: env::var("TRANSLATION_API_KEY").unwrap_or_default(),
            vision_api_key: env::var("VISION_API_KEY").unwrap_or_default(),
            mail_api_url: env::var("MAIL_API_URL").unwrap_or_else(|_| DEFAULT_MAIL_API_URL.to_string()),
            mail_api_key: env::var("MAIL_API_KEY").unwrap_or_default(),
            from_email: env::var("FROM_EMAIL").unwrap_or_else(|_| "noreply@deepshield.ai".to_string()),
            sms_api_url: env::var("SMS_API_URL").unwrap_or_else(|_| DEFAULT_SMS_API_URL.to_string()),
            sms_account_sid: env::var("SMS_ACCOUNT_SID").unwrap_or_default(),
            sms_auth_token: env::var("SMS_AUTH_TOKEN").unwrap_or_default(),
            sms_from_number: env::var("SMS_FROM_NUMBER").unwrap_or_default(),
        })
    }

    /// Configuration for tests and offline tooling: mock detectors, in-memory
    /// database, no outbound credentials.
    pub fn for_tests() -> Self {
        Self {
            detector_mode: DetectorMode::Mock,
            fallback_to_mock: true,
            db_path: ":memory:".to_string(),
            model_dir: PathBuf::from("/nonexistent/deepshield-models"),
            blacklist_path: None,
            transport_timeout: Duration::from_secs(2),
            inference_url: None,
            translation_api_key: String::new(),
            vision_api_key: String::new(),
            mail_api_url: DEFAULT_MAIL_API_URL.to_string(),
            mail_api_key: String::new(),
            from_email: "noreply@deepshield.ai".to_string(),
            sms_api_url: DEFAULT_SMS_API_URL.to_string(),
            sms_account_sid: String::new(),
            sms_auth_token: String::new(),
            sms_from_number: String::new(),
        }
    }

    /// Check that the mail relay is configured.
    /// The mail channel still runs without it; every send simply reports failure.
    pub fn require_mail(&self) -> Result<()> {
        if self.mail_api_key.is_empty() {
            anyhow::bail!(
                "MAIL_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that SMS credentials are configured.
    pub fn require_sms(&self) -> Result<()> {
        if self.sms_account_sid.is_empty()
            || self.sms_auth_token.is_empty()
            || self.sms_from_number.is_empty()
        {
            anyhow::bail!(
                "SMS_ACCOUNT_SID, SMS_AUTH_TOKEN and SMS_FROM_NUMBER must all be set.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Validate that real detectors have what they need.
    /// Mock mode needs nothing.
    pub fn require_detectors(&self) -> Result<()> {
        if self.detector_mode == DetectorMode::Mock {
            return Ok(());
        }
        if self.inference_url.is_none() {
            anyhow::bail!(
                "INFERENCE_URL not set. Real deepfake and face detectors need a model server.\n\
                 Or set DEEPSHIELD_TEST_MODE=true to use the mock detectors instead."
            );
        }
        if !crate::moderation::download::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Text classifier files not found in {}\n\
                 Run `deepshield download-model` to download them.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}

/// Parse a boolean-ish environment variable ("1", "true", "yes", "on").
fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
