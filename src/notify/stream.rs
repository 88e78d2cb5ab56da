// Persistent-stream channel: pushes the event as JSON over the user's live
// connection, if they have one.
//
// Frame shape: {"type": <kind>, "content": <payload>, "metadata": {}}.
// A failed push means the connection is dead; it is released from the
// registry so the next event doesn't try it again.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::channel::{ChannelName, NotificationChannel, NotificationEvent};
use super::registry::ConnectionRegistry;

/// Wire frame pushed to connected clients.
#[derive(Debug, Serialize)]
pub struct StreamFrame<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub content: &'a Map<String, Value>,
    pub metadata: Map<String, Value>,
}

impl<'a> StreamFrame<'a> {
    pub fn from_event(event: &'a NotificationEvent) -> Self {
        Self {
            kind: event.kind().as_str(),
            content: event.payload(),
            metadata: Map::new(),
        }
    }
}

pub struct StreamChannel {
    registry: Arc<ConnectionRegistry>,
}

impl StreamChannel {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl NotificationChannel for StreamChannel {
    fn name(&self) -> ChannelName {
        ChannelName::PersistentStream
    }

    async fn send(&self, event: &NotificationEvent) -> bool {
        let user_id = event.recipient_id();
        let Some((connection, handle)) = self.registry.lookup_connection(user_id).await else {
            debug!(user_id, "No live stream connection");
            return false;
        };

        let text = match serde_json::to_string(&StreamFrame::from_event(event)) {
            Ok(text) => text,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to serialize stream frame");
                return false;
            }
        };

        match handle.send_text(text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id, connection, error = %e, "Stream push failed, dropping connection");
                self.registry.release(user_id, connection).await;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::channel::NotificationKind;

    #[test]
    fn test_frame_shape() {
        let mut payload = Map::new();
        payload.insert("reason".into(), Value::from("spam"));
        let event = NotificationEvent::new("u1", NotificationKind::FlaggedContent, payload);

        let json = serde_json::to_value(StreamFrame::from_event(&event)).unwrap();
        assert_eq!(json["type"], "flagged_content");
        assert_eq!(json["content"]["reason"], "spam");
        assert_eq!(json["metadata"], serde_json::json!({}));
    }
}
