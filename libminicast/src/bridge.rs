//! Top-level integration component
//!
//! One explicitly-constructed `MinifeedBridge` instance coordinates all
//! minifeed activity for the process lifetime; it is injected into the
//! host's request handlers rather than reached through a global accessor.
//! It is the single writer of the publish queue and the persisted
//! identity. Within one save event the pipeline is strictly sequential:
//! permission check, flag update, eligibility check, enqueue, drain.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::MinifeedClient;
use crate::config::Settings;
use crate::error::{Result, StoreError};
use crate::excerpt;
use crate::host::{ContentHost, ContentItem, ItemKind, PUBLISH_FLAG_META, SENT_META};
use crate::identity;
use crate::notices::{NoticeSink, NOTICES_KEY};
use crate::queue::{PublishPayload, PublishQueue, QUEUE_KEY};
use crate::store::KvStore;

/// Word budget for the excerpt sent to the minifeed.
pub const EXCERPT_WORDS: usize = 150;

/// A content-save event as delivered by the host's editor.
#[derive(Debug, Clone)]
pub struct SaveEvent {
    pub item_id: String,
    /// Identifier of the actor performing the save.
    pub actor: String,
    /// Autosave-type events change no state and trigger no publish attempt.
    pub autosave: bool,
    /// One-time anti-forgery token from the editor form, if present.
    pub token: Option<String>,
    /// State of the "publish to minifeed" checkbox in the save payload.
    pub publish_requested: bool,
}

/// Loader configuration for the client-side webcurtain script.
#[derive(Debug, Clone, PartialEq)]
pub struct WebcurtainScript {
    pub gcid: String,
    pub compat: bool,
}

pub struct MinifeedBridge {
    settings: Settings,
    settings_path: Option<PathBuf>,
    client: MinifeedClient,
    queue: PublishQueue,
    notices: NoticeSink,
    host: Arc<dyn ContentHost>,
    gcid: Option<String>,
}

impl MinifeedBridge {
    /// Construct the bridge, resolving the identity once, lazily.
    ///
    /// When resolution obtains a fresh identity it is persisted back into
    /// the configuration file (if a path is known) so later startups skip
    /// the network.
    pub async fn new(
        mut settings: Settings,
        settings_path: Option<PathBuf>,
        store: Arc<dyn KvStore>,
        host: Arc<dyn ContentHost>,
    ) -> Result<Self> {
        let notices = NoticeSink::new(store.clone());
        let client = MinifeedClient::new(
            settings.api.base_url.clone(),
            settings.api.feedkey.clone(),
            notices.clone(),
        );

        let had_gcid = settings.api.gcid.is_some();
        let gcid = identity::resolve_identity(&mut settings, &client).await;
        if !had_gcid && settings.api.gcid.is_some() {
            if let Some(path) = &settings_path {
                settings.save_to_path(path)?;
            }
        }

        let queue = PublishQueue::load(store).await;

        Ok(Self {
            settings,
            settings_path,
            client,
            queue,
            notices,
            host,
            gcid,
        })
    }

    /// Handle a content-save event: the full queue-and-drain pipeline.
    ///
    /// Skips (autosave, missing permission, revision snapshot) are silent
    /// no-ops; they are not user-actionable errors. The queue
    /// is drained unconditionally at the end, whether or not this save
    /// enqueued anything, which is what retries previously failed sends
    /// on the next unrelated activity.
    pub async fn on_save(&mut self, event: &SaveEvent) {
        if event.autosave {
            return;
        }
        if !self.host.can_edit(&event.actor, &event.item_id) {
            return;
        }
        if self.host.is_revision(&event.item_id) {
            return;
        }

        // Persist the publish flag only when the one-time token verifies;
        // an absent or invalid token leaves the prior value untouched.
        if let Some(token) = &event.token {
            if self.host.verify_token(token) {
                let flag = if event.publish_requested { "1" } else { "0" };
                self.host.set_meta(&event.item_id, PUBLISH_FLAG_META, flag);
            }
        }

        // Eligibility reads the flag back, deliberately observing the
        // write just above, so publish-on-first-save works without a
        // second save.
        let already_sent = self.host.meta(&event.item_id, SENT_META).is_some();
        let publish_requested = self
            .host
            .meta(&event.item_id, PUBLISH_FLAG_META)
            .map(|v| v == "1")
            .unwrap_or(false);

        if !already_sent && publish_requested {
            match self.host.item(&event.item_id) {
                Some(item) if item.kind == ItemKind::Post => {
                    let payload = self.build_payload(&item);
                    if let Err(e) = self.queue.enqueue(&event.item_id, &payload) {
                        warn!(item_id = %event.item_id, "Failed to enqueue item: {}", e);
                    }
                }
                Some(_) => {
                    debug!(item_id = %event.item_id, "item kind not eligible for publication");
                }
                None => {
                    debug!(item_id = %event.item_id, "saved item not found in host store");
                }
            }
        }

        self.drain_queue().await;
    }

    fn build_payload(&self, item: &ContentItem) -> PublishPayload {
        let permalink = self.host.permalink(&item.id);
        let body = format!(
            "{} {}",
            excerpt::trim_words(&item.body, EXCERPT_WORDS),
            permalink
        );
        let media = self
            .host
            .featured_image(&item.id)
            .or_else(|| excerpt::first_image_src(&item.body))
            .map(|src| vec![src]);

        PublishPayload {
            title: item.title.clone(),
            body,
            shareable: self.settings.publishing.shareable,
            commentable: self.settings.publishing.commentable,
            media,
        }
    }

    /// Attempt every pending publication and persist the queue snapshot.
    pub async fn drain_queue(&mut self) {
        self.queue.drain(&self.client, self.host.as_ref()).await;
    }

    /// The resolved publisher identity, if any.
    pub fn gcid(&self) -> Option<&str> {
        self.gcid.as_deref()
    }

    pub fn queue(&self) -> &PublishQueue {
        &self.queue
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The `minifeed:gcid` meta element for page heads; absent identity
    /// renders nothing.
    pub fn meta_tag(&self) -> Option<String> {
        self.gcid
            .as_deref()
            .map(|gcid| format!(r#"<meta name="minifeed:gcid" content="{}" />"#, gcid.trim()))
    }

    /// Webcurtain loader configuration, gated on identity presence and
    /// the feature flag. Script registration itself belongs to the host.
    pub fn webcurtain_script(&self) -> Option<WebcurtainScript> {
        if !self.settings.webcurtain.enabled {
            return None;
        }
        self.gcid.as_deref().map(|gcid| WebcurtainScript {
            gcid: gcid.trim().to_string(),
            compat: self.settings.webcurtain.compat,
        })
    }

    /// Default state for the per-item publish checkbox: the item's own
    /// flag if ever saved, otherwise the configured default.
    pub fn publish_checkbox_state(&self, item_id: &str) -> bool {
        match self.host.meta(item_id, PUBLISH_FLAG_META) {
            Some(flag) => flag == "1",
            None => self.settings.publishing.default_publish,
        }
    }

    /// Flush pending notices for display on an admin page render.
    pub async fn render_notices(&self) -> Vec<String> {
        self.notices.flush().await
    }

    /// Persist the current settings (options-form save path).
    pub fn save_settings(&self) -> Result<()> {
        if let Some(path) = &self.settings_path {
            self.settings.save_to_path(path)?;
        }
        Ok(())
    }
}

/// Installation hook: write default configuration if none exists yet,
/// otherwise load what is there.
pub fn install(config_path: &Path) -> Result<Settings> {
    if config_path.exists() {
        return Settings::load_from_path(config_path);
    }
    let settings = Settings::default_config();
    settings.save_to_path(config_path)?;
    Ok(settings)
}

/// Removal hook: delete every persisted record this integration owns.
pub async fn uninstall(store: &dyn KvStore, config_path: &Path) -> Result<()> {
    store.delete(QUEUE_KEY).await?;
    store.delete(NOTICES_KEY).await?;
    if config_path.exists() {
        std::fs::remove_file(config_path).map_err(StoreError::IoError)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;
    use tempfile::TempDir;

    #[test]
    fn test_install_writes_defaults_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let settings = install(&path).unwrap();
        assert!(path.exists());
        assert!(settings.api.feedkey.is_empty());

        // A second install must not clobber operator edits.
        let mut edited = settings;
        edited.api.feedkey = "fk_live".to_string();
        edited.save_to_path(&path).unwrap();

        let reloaded = install(&path).unwrap();
        assert_eq!(reloaded.api.feedkey, "fk_live");
    }

    #[tokio::test]
    async fn test_uninstall_deletes_persisted_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        install(&path).unwrap();

        let store = MemoryKvStore::new();
        store.set(QUEUE_KEY, "[]", None).await.unwrap();
        store.set(NOTICES_KEY, "[]", None).await.unwrap();

        uninstall(&store, &path).await.unwrap();

        assert!(!path.exists());
        assert_eq!(store.get(QUEUE_KEY).await.unwrap(), None);
        assert_eq!(store.get(NOTICES_KEY).await.unwrap(), None);
    }
}
