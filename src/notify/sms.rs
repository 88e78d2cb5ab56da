// Short-message channel: renders a one-line alert and sends it through an
// SMS transport (Twilio's Messages REST API in production).
//
// A transport failure is reported as `false`, the same as every other channel.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::channel::{ChannelName, NotificationChannel, NotificationEvent, NotificationKind};
use super::directory::UserDirectory;

#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn deliver(&self, to: &str, body: &str) -> Result<()>;
}

/// Twilio Messages API transport (form-encoded POST, basic auth).
pub struct TwilioSmsTransport {
    client: Client,
    api_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSmsTransport {
    /// `api_url` may contain an `{account_sid}` placeholder.
    pub fn new(
        api_url: &str,
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build SMS HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.replace("{account_sid}", account_sid),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        })
    }
}

#[async_trait]
impl SmsTransport for TwilioSmsTransport {
    async fn deliver(&self, to: &str, body: &str) -> Result<()> {
        if self.account_sid.is_empty() || self.auth_token.is_empty() || self.from_number.is_empty()
        {
            anyhow::bail!("SMS transport not configured");
        }

        let response = self
            .client
            .post(&self.api_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .context("Failed to call SMS API")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("SMS API returned {}: {}", status, text);
        }
        Ok(())
    }
}

pub struct SmsChannel {
    directory: Arc<dyn UserDirectory>,
    transport: Arc<dyn SmsTransport>,
}

impl SmsChannel {
    pub fn new(directory: Arc<dyn UserDirectory>, transport: Arc<dyn SmsTransport>) -> Self {
        Self {
            directory,
            transport,
        }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn name(&self) -> ChannelName {
        ChannelName::ShortMessage
    }

    async fn send(&self, event: &NotificationEvent) -> bool {
        let user_id = event.recipient_id();
        let number = match self.directory.contact(user_id).await {
            Ok(Some(contact)) => contact.phone,
            Ok(None) => None,
            Err(e) => {
                warn!(user_id, error = %e, "User directory lookup failed");
                return false;
            }
        };
        let Some(to) = number else {
            debug!(user_id, "No phone number on file, skipping SMS");
            return false;
        };

        let body = render_text(event);
        match self.transport.deliver(&to, &body).await {
            Ok(()) => {
                debug!(user_id, kind = %event.kind(), "SMS delivered");
                true
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to send SMS notification");
                false
            }
        }
    }
}

/// Render the short text for an event.
pub fn render_text(event: &NotificationEvent) -> String {
    match event.kind() {
        NotificationKind::FlaggedContent => format!(
            "DeepShield Alert: Your content has been flagged. Reason: {}",
            event.field("reason")
        ),
        NotificationKind::MediaMisuse => format!(
            "DeepShield Alert: Potential misuse of your media detected. Type: {}",
            event.field("type")
        ),
        NotificationKind::Other(_) => "DeepShield: You have a new notification.".to_string(),
    }
}
