//! Publish queue: the durable retry buffer
//!
//! A mapping from content-item identifier to an already-serialized
//! publish payload, snapshotted into the key-value store. Presence of an
//! entry means "publication pending or previously failed, not yet
//! confirmed"; entries leave the queue only on confirmed success or
//! manual removal.
//!
//! The snapshot is read-modify-written by whole save events, so two
//! concurrent saves can lose one writer's update (last snapshot wins).
//! That is an accepted property: the queue is a best-effort retry buffer,
//! not a transactional ledger. Delivery is at-least-once-eventually;
//! duplicate publication risk is bounded by the remote API's own
//! idempotency, not by this queue.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::MinifeedClient;
use crate::error::Result;
use crate::host::{ContentHost, SENT_META};
use crate::store::KvStore;

/// Store key holding the queue snapshot.
pub const QUEUE_KEY: &str = "minicast.pub_queue";

/// Outbound request payload for `POST minifeed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishPayload {
    pub title: String,
    pub body: String,
    pub shareable: bool,
    pub commentable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<String>>,
}

/// One pending publication: item identifier plus the serialized body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub item_id: String,
    pub body: String,
}

pub struct PublishQueue {
    store: Arc<dyn KvStore>,
    entries: Vec<QueueEntry>,
}

impl PublishQueue {
    /// Restore the queue from its persisted snapshot.
    ///
    /// An unreadable or unparseable snapshot degrades to an empty queue
    /// with a warning; the queue is a retry buffer, not a ledger.
    pub async fn load(store: Arc<dyn KvStore>) -> Self {
        let entries = match store.get(QUEUE_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Discarding unparseable queue snapshot: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load queue snapshot: {}", e);
                Vec::new()
            }
        };
        Self { store, entries }
    }

    /// Insert a pending publication, overwriting any stale entry for the
    /// same item while keeping its original position.
    pub fn enqueue(&mut self, item_id: &str, payload: &PublishPayload) -> Result<()> {
        let body = serde_json::to_string(payload).map_err(crate::error::StoreError::from)?;
        if let Some(existing) = self.entries.iter_mut().find(|e| e.item_id == item_id) {
            existing.body = body;
        } else {
            self.entries.push(QueueEntry {
                item_id: item_id.to_string(),
                body,
            });
        }
        Ok(())
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.entries.iter().any(|e| e.item_id == item_id)
    }

    /// Remove a single entry; returns whether anything was removed.
    pub fn remove(&mut self, item_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.item_id != item_id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Attempt every queued publication, then persist the snapshot.
    ///
    /// Entries are processed in insertion order. A confirmed send sets the
    /// item's sent marker (remote post id as the value) and removes the
    /// entry; any failure leaves the entry exactly as it was, for retry on
    /// the next save event. The snapshot is persisted unconditionally
    /// afterwards, even when unchanged or empty, so the durable copy and
    /// its expiry stay fresh. Running drain twice under unchanged network
    /// conditions yields the same remaining queue.
    pub async fn drain(&mut self, client: &MinifeedClient, host: &dyn ContentHost) {
        let mut remaining = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match client.publish(&entry.body).await {
                Some(response) => {
                    info!(item_id = %entry.item_id, remote_id = %response.id, "published to minifeed");
                    host.set_meta(&entry.item_id, SENT_META, &response.id);
                }
                None => {
                    // Failure already routed to the notice sink by the client.
                    remaining.push(entry);
                }
            }
        }
        self.entries = remaining;

        if let Err(e) = self.persist().await {
            warn!("Failed to persist queue snapshot: {}", e);
        }
    }

    /// Persist the current snapshot.
    pub async fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.entries).map_err(crate::error::StoreError::from)?;
        self.store.set(QUEUE_KEY, &raw, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;

    fn payload(title: &str) -> PublishPayload {
        PublishPayload {
            title: title.to_string(),
            body: format!("{} body https://blog.example/?p=1", title),
            shareable: true,
            commentable: false,
            media: None,
        }
    }

    #[tokio::test]
    async fn test_enqueue_overwrites_stale_entry_in_place() {
        let store = Arc::new(MemoryKvStore::new());
        let mut queue = PublishQueue::load(store).await;

        queue.enqueue("42", &payload("first")).unwrap();
        queue.enqueue("43", &payload("other")).unwrap();
        queue.enqueue("42", &payload("revised")).unwrap();

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.entries()[0].item_id, "42");
        assert!(queue.entries()[0].body.contains("revised"));
        assert_eq!(queue.entries()[1].item_id, "43");
    }

    #[tokio::test]
    async fn test_snapshot_round_trip_preserves_order() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());

        let mut queue = PublishQueue::load(store.clone()).await;
        queue.enqueue("9", &payload("nine")).unwrap();
        queue.enqueue("3", &payload("three")).unwrap();
        queue.enqueue("7", &payload("seven")).unwrap();
        queue.persist().await.unwrap();

        let restored = PublishQueue::load(store).await;
        let ids: Vec<&str> = restored.entries().iter().map(|e| e.item_id.as_str()).collect();
        assert_eq!(ids, vec!["9", "3", "7"]);
    }

    #[tokio::test]
    async fn test_unparseable_snapshot_degrades_to_empty() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        store.set(QUEUE_KEY, "{not json", None).await.unwrap();

        let queue = PublishQueue::load(store).await;
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_contains() {
        let store = Arc::new(MemoryKvStore::new());
        let mut queue = PublishQueue::load(store).await;
        queue.enqueue("42", &payload("t")).unwrap();

        assert!(queue.contains("42"));
        assert!(queue.remove("42"));
        assert!(!queue.contains("42"));
        assert!(!queue.remove("42"));
    }

    #[test]
    fn test_payload_media_omitted_when_absent() {
        let serialized = serde_json::to_string(&payload("t")).unwrap();
        assert!(!serialized.contains("media"));

        let mut with_media = payload("t");
        with_media.media = Some(vec!["https://x/y.png".to_string()]);
        let serialized = serde_json::to_string(&with_media).unwrap();
        assert!(serialized.contains(r#""media":["https://x/y.png"]"#));
    }
}
