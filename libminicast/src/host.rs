//! Host CMS collaborators
//!
//! The bridge never talks to the host platform directly; everything it
//! needs (item retrieval, permissions, per-item metadata, permalinks,
//! anti-forgery tokens) comes through this trait. Implementing it for a
//! real CMS is the embedder's job; `MockHost` is available to all builds
//! so integration tests can drive the full save pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Per-item metadata key for the "publish requested" flag ("1"/"0").
pub const PUBLISH_FLAG_META: &str = "minifeed_publish";

/// Per-item metadata key for the sent marker; presence implies the item
/// was confirmed published, value is the remote post id.
pub const SENT_META: &str = "minifeed_sent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// A primary post, the only kind eligible for publication.
    Post,
    Page,
    Attachment,
}

#[derive(Debug, Clone)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub body: String,
    pub kind: ItemKind,
}

/// Seam to the host content store.
pub trait ContentHost: Send + Sync {
    /// Retrieve an item by identifier.
    fn item(&self, id: &str) -> Option<ContentItem>;

    /// Whether the actor may edit the item.
    fn can_edit(&self, actor: &str, id: &str) -> bool;

    /// Whether the identifier names a revision snapshot rather than a
    /// primary item.
    fn is_revision(&self, id: &str) -> bool;

    /// Permanent public URL for the item.
    fn permalink(&self, id: &str) -> String;

    /// URL of the designated featured-image rendition, if any.
    fn featured_image(&self, id: &str) -> Option<String>;

    /// Read a named per-item metadata value.
    fn meta(&self, id: &str, key: &str) -> Option<String>;

    /// Write a named per-item metadata value.
    fn set_meta(&self, id: &str, key: &str, value: &str);

    /// Verify a one-time anti-forgery token from a form submission.
    fn verify_token(&self, token: &str) -> bool;
}

/// Configurable in-memory host for tests
#[derive(Default)]
pub struct MockHost {
    items: Mutex<HashMap<String, ContentItem>>,
    meta: Mutex<HashMap<(String, String), String>>,
    /// Log of every set_meta call, for asserting write counts.
    meta_writes: Mutex<Vec<(String, String, String)>>,
    revisions: Mutex<HashSet<String>>,
    denied_actors: Mutex<HashSet<String>>,
    featured_images: Mutex<HashMap<String, String>>,
    valid_tokens: Mutex<HashSet<String>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&self, item: ContentItem) {
        self.items
            .lock()
            .unwrap()
            .insert(item.id.clone(), item);
    }

    pub fn add_revision(&self, id: &str) {
        self.revisions.lock().unwrap().insert(id.to_string());
    }

    pub fn deny_actor(&self, actor: &str) {
        self.denied_actors.lock().unwrap().insert(actor.to_string());
    }

    pub fn set_featured_image(&self, id: &str, url: &str) {
        self.featured_images
            .lock()
            .unwrap()
            .insert(id.to_string(), url.to_string());
    }

    pub fn issue_token(&self, token: &str) {
        self.valid_tokens.lock().unwrap().insert(token.to_string());
    }

    /// Number of set_meta calls writing the given key for the given item.
    pub fn meta_write_count(&self, id: &str, key: &str) -> usize {
        self.meta_writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(wid, wkey, _)| wid == id && wkey == key)
            .count()
    }
}

impl ContentHost for MockHost {
    fn item(&self, id: &str) -> Option<ContentItem> {
        self.items.lock().unwrap().get(id).cloned()
    }

    fn can_edit(&self, actor: &str, _id: &str) -> bool {
        !self.denied_actors.lock().unwrap().contains(actor)
    }

    fn is_revision(&self, id: &str) -> bool {
        self.revisions.lock().unwrap().contains(id)
    }

    fn permalink(&self, id: &str) -> String {
        format!("https://blog.example/?p={}", id)
    }

    fn featured_image(&self, id: &str) -> Option<String> {
        self.featured_images.lock().unwrap().get(id).cloned()
    }

    fn meta(&self, id: &str, key: &str) -> Option<String> {
        self.meta
            .lock()
            .unwrap()
            .get(&(id.to_string(), key.to_string()))
            .cloned()
    }

    fn set_meta(&self, id: &str, key: &str, value: &str) {
        self.meta
            .lock()
            .unwrap()
            .insert((id.to_string(), key.to_string()), value.to_string());
        self.meta_writes.lock().unwrap().push((
            id.to_string(),
            key.to_string(),
            value.to_string(),
        ));
    }

    fn verify_token(&self, token: &str) -> bool {
        // One-time use: a verified token cannot be replayed.
        self.valid_tokens.lock().unwrap().remove(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_host_meta_round_trip() {
        let host = MockHost::new();
        assert_eq!(host.meta("42", PUBLISH_FLAG_META), None);

        host.set_meta("42", PUBLISH_FLAG_META, "1");
        assert_eq!(host.meta("42", PUBLISH_FLAG_META).as_deref(), Some("1"));
        assert_eq!(host.meta_write_count("42", PUBLISH_FLAG_META), 1);
    }

    #[test]
    fn test_mock_host_token_is_one_time_use() {
        let host = MockHost::new();
        host.issue_token("tok-1");

        assert!(host.verify_token("tok-1"));
        assert!(!host.verify_token("tok-1"));
        assert!(!host.verify_token("never-issued"));
    }

    #[test]
    fn test_mock_host_permissions_and_revisions() {
        let host = MockHost::new();
        host.deny_actor("viewer");
        host.add_revision("42-rev-3");

        assert!(host.can_edit("editor", "42"));
        assert!(!host.can_edit("viewer", "42"));
        assert!(host.is_revision("42-rev-3"));
        assert!(!host.is_revision("42"));
    }
}
