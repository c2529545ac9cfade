//! Notice sink for operator-visible failures
//!
//! Failures are produced during save events but displayed on a later
//! admin page render, a different request lifecycle entirely, so the set
//! of pending messages lives in the key-value store rather than in
//! memory. It is a best-effort signal, not an audit log: store failures
//! degrade to a warning and the set is cleared every time it is rendered.

use std::sync::Arc;
use tracing::warn;

use crate::store::KvStore;

/// Store key holding the pending notice set.
pub const NOTICES_KEY: &str = "minicast.notices";

/// Fixed prefix framing every rendered notice.
pub const NOTICE_PREFIX: &str = "Minifeed integration: ";

/// Deduplicated, insertion-ordered set of pending operator notices.
#[derive(Clone)]
pub struct NoticeSink {
    store: Arc<dyn KvStore>,
}

impl NoticeSink {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Append a message if not already pending, persisting immediately.
    ///
    /// Duplicate messages (string equality) are dropped, so a failure
    /// repeating across many save events renders exactly once.
    pub async fn record(&self, message: &str) {
        let mut messages = self.load().await;
        if messages.iter().any(|m| m == message) {
            return;
        }
        messages.push(message.to_string());
        self.persist(&messages).await;
    }

    /// Render all pending messages, framed, then clear the persisted set.
    ///
    /// Returns one line per distinct message in insertion order; an empty
    /// set renders nothing.
    pub async fn flush(&self) -> Vec<String> {
        let messages = self.load().await;
        if messages.is_empty() {
            return Vec::new();
        }
        if let Err(e) = self.store.delete(NOTICES_KEY).await {
            warn!("Failed to clear notice set: {}", e);
        }
        messages
            .into_iter()
            .map(|m| format!("{}{}", NOTICE_PREFIX, m))
            .collect()
    }

    /// Peek at pending messages without clearing them.
    pub async fn pending(&self) -> Vec<String> {
        self.load().await
    }

    async fn load(&self) -> Vec<String> {
        match self.store.get(NOTICES_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Discarding unparseable notice set: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load notice set: {}", e);
                Vec::new()
            }
        }
    }

    async fn persist(&self, messages: &[String]) {
        let raw = match serde_json::to_string(messages) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize notice set: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(NOTICES_KEY, &raw, None).await {
            warn!("Failed to persist notice set: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;

    fn sink() -> NoticeSink {
        NoticeSink::new(Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn test_record_deduplicates() {
        let sink = sink();
        sink.record("There was an error contacting the API server.")
            .await;
        sink.record("There was an error contacting the API server.")
            .await;
        sink.record("There was an error contacting the API server.")
            .await;

        let rendered = sink.flush().await;
        assert_eq!(rendered.len(), 1);
    }

    #[tokio::test]
    async fn test_flush_frames_and_preserves_insertion_order() {
        let sink = sink();
        sink.record("first failure").await;
        sink.record("second failure").await;

        let rendered = sink.flush().await;
        assert_eq!(
            rendered,
            vec![
                "Minifeed integration: first failure".to_string(),
                "Minifeed integration: second failure".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_flush_clears_the_set() {
        let sink = sink();
        sink.record("stale failure").await;

        assert_eq!(sink.flush().await.len(), 1);
        assert!(sink.flush().await.is_empty());
        assert!(sink.pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_flush_empty_renders_nothing() {
        let sink = sink();
        assert!(sink.flush().await.is_empty());
    }

    #[tokio::test]
    async fn test_notices_shared_across_sink_instances() {
        // Producer and consumer run in different request lifecycles; only
        // the store is shared.
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let producer = NoticeSink::new(store.clone());
        let consumer = NoticeSink::new(store);

        producer.record("queued failure").await;
        let rendered = consumer.flush().await;
        assert_eq!(rendered, vec!["Minifeed integration: queued failure"]);
    }
}
