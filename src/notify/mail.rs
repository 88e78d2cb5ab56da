// Mail channel: renders a kind-specific HTML message and hands it to a mail
// transport.
//
// The production transport posts to an HTTP mail relay in the SendGrid v3
// `mail/send` shape. Any failure along the way (unknown user, no address,
// relay error, timeout) is logged and reported as `false`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use super::channel::{ChannelName, NotificationChannel, NotificationEvent, NotificationKind};
use super::directory::UserDirectory;

/// A fully rendered outbound email.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: &MailMessage) -> Result<()>;
}

/// HTTP mail relay transport (SendGrid v3 request format, bearer auth).
pub struct HttpMailTransport {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpMailTransport {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build mail HTTP client")?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn deliver(&self, message: &MailMessage) -> Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!("Mail relay not configured (MAIL_API_KEY is empty)");
        }

        let body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": message.from },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html }],
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to call mail relay")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Mail relay returned {}: {}", status, text);
        }
        Ok(())
    }
}

pub struct MailChannel {
    directory: Arc<dyn UserDirectory>,
    transport: Arc<dyn MailTransport>,
    from: String,
}

impl MailChannel {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        transport: Arc<dyn MailTransport>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            transport,
            from: from.into(),
        }
    }
}

#[async_trait]
impl NotificationChannel for MailChannel {
    fn name(&self) -> ChannelName {
        ChannelName::Mail
    }

    async fn send(&self, event: &NotificationEvent) -> bool {
        let user_id = event.recipient_id();
        let address = match self.directory.contact(user_id).await {
            Ok(Some(contact)) => contact.email,
            Ok(None) => None,
            Err(e) => {
                warn!(user_id, error = %e, "User directory lookup failed");
                return false;
            }
        };
        let Some(to) = address else {
            debug!(user_id, "No email address on file, skipping mail");
            return false;
        };

        let message = MailMessage {
            from: self.from.clone(),
            to,
            subject: subject_for(event.kind()).to_string(),
            html: render_body(event),
        };

        match self.transport.deliver(&message).await {
            Ok(()) => {
                debug!(user_id, kind = %event.kind(), "Mail delivered");
                true
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to send email notification");
                false
            }
        }
    }
}

pub fn subject_for(kind: &NotificationKind) -> &'static str {
    match kind {
        NotificationKind::FlaggedContent => "Content Flagged - DeepShield Alert",
        NotificationKind::MediaMisuse => "Media Misuse Detected - DeepShield Alert",
        NotificationKind::Other(_) => "DeepShield Notification",
    }
}

/// Render the HTML body for an event. Unknown kinds get the generic template.
pub fn render_body(event: &NotificationEvent) -> String {
    match event.kind() {
        NotificationKind::FlaggedContent => format!(
            "<html><body>\
             <h2>Content Flagged</h2>\
             <p>Your content has been flagged for review:</p>\
             <p><strong>Reason:</strong> {}</p>\
             <p><strong>Details:</strong> {}</p>\
             </body></html>",
            escape_html(&event.field("reason")),
            escape_html(&event.field("details")),
        ),
        NotificationKind::MediaMisuse => format!(
            "<html><body>\
             <h2>Media Misuse Detected</h2>\
             <p>We detected potential misuse of your media:</p>\
             <p><strong>Type:</strong> {}</p>\
             <p><strong>Details:</strong> {}</p>\
             </body></html>",
            escape_html(&event.field("type")),
            escape_html(&event.field("details")),
        ),
        NotificationKind::Other(_) => "<html><body>\
             <h2>DeepShield Notification</h2>\
             <p>You have a new notification from DeepShield.</p>\
             </body></html>"
            .to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
