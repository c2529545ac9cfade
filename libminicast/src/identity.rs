//! Publisher identity (GCID) resolution
//!
//! The remote service assigns one identity per feed key and the mapping is
//! effectively immutable, so the identity is resolved at most once per
//! installation and then persisted into configuration. An earlier design
//! cached the identity with a 24-hour expiry in the transient store; that
//! policy is deprecated and must not be reintroduced. Re-resolution
//! requires an explicit reset of the persisted value
//! (`mini-verify --reset`).

use crate::api::MinifeedClient;
use crate::config::Settings;

/// Resolve the publisher identity, in strict priority order:
///
/// 1. a persisted `api.gcid` is returned as-is, with zero network calls;
/// 2. otherwise, a configured feed key triggers `verifyminifeed`; on
///    success the identity is written into `settings.api.gcid` (the
///    caller is responsible for saving the mutated configuration);
/// 3. otherwise (no feed key, or the call failed) the identity is absent.
pub async fn resolve_identity(
    settings: &mut Settings,
    client: &MinifeedClient,
) -> Option<String> {
    if let Some(gcid) = settings.api.gcid.as_deref() {
        if !gcid.is_empty() {
            return Some(gcid.to_string());
        }
    }

    if settings.api.feedkey.is_empty() {
        return None;
    }

    let response = client.verify_minifeed().await?;
    settings.api.gcid = Some(response.gcid.clone());
    Some(response.gcid)
}

/// Clear the persisted identity so the next resolution hits the network.
pub fn reset_identity(settings: &mut Settings) -> bool {
    settings.api.gcid.take().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notices::NoticeSink;
    use crate::store::MemoryKvStore;
    use std::sync::Arc;

    fn client_at(base_url: &str) -> MinifeedClient {
        let notices = NoticeSink::new(Arc::new(MemoryKvStore::new()));
        MinifeedClient::new(base_url.to_string(), "fk_test".to_string(), notices)
    }

    #[tokio::test]
    async fn test_persisted_gcid_short_circuits() {
        // Base URL points nowhere; a network call would fail loudly.
        let client = client_at("http://127.0.0.1:1");
        let mut settings = Settings::default_config();
        settings.api.feedkey = "fk_test".to_string();
        settings.api.gcid = Some("CACHED".to_string());

        let gcid = resolve_identity(&mut settings, &client).await;
        assert_eq!(gcid.as_deref(), Some("CACHED"));
    }

    #[tokio::test]
    async fn test_no_feedkey_no_gcid_is_absent() {
        let client = client_at("http://127.0.0.1:1");
        let mut settings = Settings::default_config();
        assert!(settings.api.feedkey.is_empty());

        let gcid = resolve_identity(&mut settings, &client).await;
        assert!(gcid.is_none());
        assert!(settings.api.gcid.is_none());
    }

    #[tokio::test]
    async fn test_empty_persisted_gcid_does_not_short_circuit() {
        let client = client_at("http://127.0.0.1:1");
        let mut settings = Settings::default_config();
        settings.api.gcid = Some(String::new());
        // No feed key either, so resolution falls through to absent.
        let gcid = resolve_identity(&mut settings, &client).await;
        assert!(gcid.is_none());
    }

    #[test]
    fn test_reset_identity() {
        let mut settings = Settings::default_config();
        settings.api.gcid = Some("ABC123".to_string());

        assert!(reset_identity(&mut settings));
        assert!(settings.api.gcid.is_none());
        assert!(!reset_identity(&mut settings));
    }
}
