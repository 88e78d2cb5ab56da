// Notification dispatcher: fans one event out to every channel.
//
// Channels run concurrently and independently: one channel failing, hanging
// or timing out has no effect on the others. The composite result always
// reports `success: true` once dispatch has run; per-channel truth lives in
// `channels`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::channel::{ChannelName, NotificationChannel, NotificationEvent, NotificationKind};

/// Outcome of a single dispatch across all channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Marks that dispatch ran. Not an AND of the channel outcomes.
    pub success: bool,
    pub channels: BTreeMap<ChannelName, bool>,
}

impl DispatchResult {
    /// True if at least one channel delivered the event.
    pub fn delivered_anywhere(&self) -> bool {
        self.channels.values().any(|ok| *ok)
    }
}

pub struct Dispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    timeout: Duration,
}

impl Dispatcher {
    /// The standard three-channel dispatcher.
    pub fn new(
        mail: Arc<dyn NotificationChannel>,
        short_message: Arc<dyn NotificationChannel>,
        stream: Arc<dyn NotificationChannel>,
        timeout: Duration,
    ) -> Self {
        Self::with_channels(vec![mail, short_message, stream], timeout)
    }

    pub fn with_channels(channels: Vec<Arc<dyn NotificationChannel>>, timeout: Duration) -> Self {
        Self { channels, timeout }
    }

    /// Deliver `event` through every channel and collect the outcomes.
    pub async fn dispatch(&self, event: &NotificationEvent) -> DispatchResult {
        let attempts = self.channels.iter().map(|channel| async move {
            let name = channel.name();
            let delivered = match tokio::time::timeout(self.timeout, channel.send(event)).await {
                Ok(delivered) => delivered,
                Err(_) => {
                    warn!(
                        channel = %name,
                        user_id = event.recipient_id(),
                        "Channel timed out"
                    );
                    false
                }
            };
            (name, delivered)
        });

        let channels: BTreeMap<ChannelName, bool> = join_all(attempts).await.into_iter().collect();

        info!(
            user_id = event.recipient_id(),
            kind = %event.kind(),
            mail = channels.get(&ChannelName::Mail).copied().unwrap_or(false),
            short_message = channels.get(&ChannelName::ShortMessage).copied().unwrap_or(false),
            persistent_stream = channels
                .get(&ChannelName::PersistentStream)
                .copied()
                .unwrap_or(false),
            "Notification dispatched"
        );

        DispatchResult {
            success: true,
            channels,
        }
    }

    pub async fn notify_content_flagged(
        &self,
        user_id: &str,
        payload: Map<String, Value>,
    ) -> DispatchResult {
        let event = NotificationEvent::new(user_id, NotificationKind::FlaggedContent, payload);
        self.dispatch(&event).await
    }

    pub async fn notify_media_misuse(
        &self,
        user_id: &str,
        payload: Map<String, Value>,
    ) -> DispatchResult {
        let event = NotificationEvent::new(user_id, NotificationKind::MediaMisuse, payload);
        self.dispatch(&event).await
    }
}
