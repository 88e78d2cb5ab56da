// Live-connection registry for the persistent-stream channel.
//
// Maps a user id to exactly one open connection. The map is split into
// shards, each behind its own tokio Mutex, and a user id always hashes to the
// same shard. Every mutation for one user is serialized while unrelated
// users proceed in parallel.
//
// Closing a replaced or disconnected handle happens while the shard lock is
// held, after the entry has been removed from the map. At most one entry is
// live per user, and the registry closes a handle at most once.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

/// Number of shards when none is specified.
pub const DEFAULT_SHARDS: usize = 16;

/// Upper bound on a graceful close before we give up on the old handle.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Identifies one specific connection, distinct across reconnects of the same user.
pub type ConnectionId = u64;

/// The writable half of a bidirectional stream (a websocket in production).
#[async_trait]
pub trait StreamHandle: Send + Sync {
    /// Push one text frame to the client.
    async fn send_text(&self, text: String) -> Result<()>;

    /// Gracefully close the stream.
    async fn close(&self) -> Result<()>;
}

struct Entry {
    id: ConnectionId,
    handle: Arc<dyn StreamHandle>,
}

pub struct ConnectionRegistry {
    shards: Vec<Mutex<HashMap<String, Entry>>>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(shards: usize) -> Self {
        let shards = (0..shards.max(1)).map(|_| Mutex::new(HashMap::new())).collect();
        Self {
            shards,
            next_id: AtomicU64::new(1),
        }
    }

    fn shard(&self, user_id: &str) -> &Mutex<HashMap<String, Entry>> {
        let mut hasher = DefaultHasher::new();
        user_id.hash(&mut hasher);
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// Register a connection for `user_id`, closing any connection it replaces.
    ///
    /// Never fails: a close error on the old handle is logged and swallowed.
    pub async fn connect(&self, user_id: &str, handle: Arc<dyn StreamHandle>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut map = self.shard(user_id).lock().await;

        if let Some(old) = map.remove(user_id) {
            debug!(user_id, old_connection = old.id, new_connection = id, "Replacing stream connection");
            close_quietly(user_id, &old).await;
        }

        map.insert(user_id.to_string(), Entry { id, handle });
        debug!(user_id, connection = id, "Stream connected");
        id
    }

    /// Close and remove the user's connection. No-op if there is none.
    pub async fn disconnect(&self, user_id: &str) {
        let mut map = self.shard(user_id).lock().await;
        if let Some(old) = map.remove(user_id) {
            debug!(user_id, connection = old.id, "Stream disconnected");
            close_quietly(user_id, &old).await;
        }
    }

    /// Close and remove the user's connection only if it is still `connection_id`.
    ///
    /// Returns true if an entry was removed. A connection that was already
    /// replaced leaves the newer entry untouched.
    pub async fn release(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        let mut map = self.shard(user_id).lock().await;
        match map.get(user_id) {
            Some(entry) if entry.id == connection_id => {
                if let Some(old) = map.remove(user_id) {
                    debug!(user_id, connection = old.id, "Stream released");
                    close_quietly(user_id, &old).await;
                }
                true
            }
            _ => false,
        }
    }

    /// The live handle for `user_id`, if any.
    pub async fn lookup(&self, user_id: &str) -> Option<Arc<dyn StreamHandle>> {
        self.lookup_connection(user_id).await.map(|(_, handle)| handle)
    }

    /// The live handle together with its connection id.
    pub async fn lookup_connection(
        &self,
        user_id: &str,
    ) -> Option<(ConnectionId, Arc<dyn StreamHandle>)> {
        let map = self.shard(user_id).lock().await;
        map.get(user_id).map(|e| (e.id, Arc::clone(&e.handle)))
    }

    /// Number of users with a live connection.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn close_quietly(user_id: &str, entry: &Entry) {
    match tokio::time::timeout(CLOSE_TIMEOUT, entry.handle.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(user_id, connection = entry.id, error = %e, "Ignoring close failure"),
        Err(_) => debug!(user_id, connection = entry.id, "Close timed out"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingHandle {
        closes: AtomicUsize,
    }

    #[async_trait]
    impl StreamHandle for CountingHandle {
        async fn send_text(&self, _text: String) -> Result<()> {
            Ok(())
        }
        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn handle() -> Arc<CountingHandle> {
        Arc::new(CountingHandle {
            closes: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let registry = ConnectionRegistry::with_shards(1);
        let a = registry.connect("u1", handle()).await;
        let b = registry.connect("u2", handle()).await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_release_ignores_stale_connection() {
        let registry = ConnectionRegistry::new();
        let first = registry.connect("u1", handle()).await;
        let newer = handle();
        let second = registry.connect("u1", newer.clone()).await;

        assert!(!registry.release("u1", first).await);
        let (live, _) = registry.lookup_connection("u1").await.unwrap();
        assert_eq!(live, second);
        assert_eq!(newer.closes.load(Ordering::SeqCst), 0);

        assert!(registry.release("u1", second).await);
        assert!(registry.is_empty().await);
        assert_eq!(newer.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_shard_still_isolates_users() {
        let registry = ConnectionRegistry::with_shards(0);
        registry.connect("a", handle()).await;
        registry.connect("b", handle()).await;
        registry.disconnect("a").await;
        assert!(registry.lookup("a").await.is_none());
        assert!(registry.lookup("b").await.is_some());
    }
}
