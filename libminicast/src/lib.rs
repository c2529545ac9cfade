//! Minicast - bridge a CMS publishing flow into a minifeed timeline
//!
//! This library implements the integration core that sits between a host
//! content-management system and the remote minifeed publishing API:
//! a feed-key-authenticated API client, a once-per-install identity
//! resolver, a durable publish queue with retry-on-next-activity
//! semantics, and a deduplicated notice sink for operator-visible errors.

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod excerpt;
pub mod host;
pub mod identity;
pub mod logging;
pub mod notices;
pub mod queue;
pub mod store;

// Re-export commonly used types
pub use api::MinifeedClient;
pub use bridge::{MinifeedBridge, SaveEvent};
pub use config::Settings;
pub use error::{MinicastError, Result};
pub use host::{ContentHost, ContentItem, ItemKind, MockHost};
pub use notices::NoticeSink;
pub use queue::{PublishPayload, PublishQueue};
pub use store::{KvStore, MemoryKvStore, SqliteKvStore};
