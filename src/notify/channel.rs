// Notification channel trait and the event type every channel consumes.
//
// A channel takes one event and reports a plain boolean: did this channel
// deliver it. Channels never return errors to the dispatcher; every failure
// mode collapses to `false` inside the channel.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What happened that the user is being told about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    FlaggedContent,
    MediaMisuse,
    /// Any kind the templates don't know; rendered with the generic template.
    Other(String),
}

impl NotificationKind {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::FlaggedContent => "flagged_content",
            NotificationKind::MediaMisuse => "media_misuse",
            NotificationKind::Other(kind) => kind,
        }
    }
}

impl From<&str> for NotificationKind {
    fn from(value: &str) -> Self {
        match value {
            "flagged_content" => NotificationKind::FlaggedContent,
            "media_misuse" => NotificationKind::MediaMisuse,
            other => NotificationKind::Other(other.to_string()),
        }
    }
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        NotificationKind::from(value.as_str())
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single logical notification. Immutable once built; channels only borrow it.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    recipient_id: String,
    kind: NotificationKind,
    payload: Map<String, Value>,
}

impl NotificationEvent {
    pub fn new(
        recipient_id: impl Into<String>,
        kind: NotificationKind,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            kind,
            payload,
        }
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    pub fn kind(&self) -> &NotificationKind {
        &self.kind
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Render a payload field for human-readable templates.
    /// Strings are used as-is, other JSON values are serialized, missing fields become "N/A".
    pub fn field(&self, key: &str) -> String {
        match self.payload.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "N/A".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// The three delivery mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelName {
    Mail,
    ShortMessage,
    PersistentStream,
}

impl ChannelName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelName::Mail => "mail",
            ChannelName::ShortMessage => "short_message",
            ChannelName::PersistentStream => "persistent_stream",
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One delivery mechanism for notifications.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> ChannelName;

    /// Attempt delivery. Returns true only if this channel handed the event off.
    async fn send(&self, event: &NotificationEvent) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_strings() {
        assert_eq!(
            NotificationKind::from("flagged_content"),
            NotificationKind::FlaggedContent
        );
        assert_eq!(NotificationKind::from("media_misuse"), NotificationKind::MediaMisuse);
        assert_eq!(
            NotificationKind::from("account_notice"),
            NotificationKind::Other("account_notice".to_string())
        );
        assert_eq!(NotificationKind::MediaMisuse.as_str(), "media_misuse");
    }

    #[test]
    fn test_kind_serializes_as_plain_string() {
        let json = serde_json::to_string(&NotificationKind::FlaggedContent).unwrap();
        assert_eq!(json, "\"flagged_content\"");
    }

    #[test]
    fn test_field_renders_missing_and_non_string_values() {
        let mut payload = Map::new();
        payload.insert("reason".into(), Value::from("spam"));
        payload.insert("confidence".into(), Value::from(0.9));
        let event = NotificationEvent::new("u1", NotificationKind::FlaggedContent, payload);

        assert_eq!(event.field("reason"), "spam");
        assert_eq!(event.field("confidence"), "0.9");
        assert_eq!(event.field("details"), "N/A");
    }

    #[test]
    fn test_channel_names_serialize_snake_case() {
        let json = serde_json::to_string(&ChannelName::PersistentStream).unwrap();
        assert_eq!(json, "\"persistent_stream\"");
        assert_eq!(ChannelName::ShortMessage.to_string(), "short_message");
    }
}
