//! Minifeed API client
//!
//! A stateless (per-request) collaborator: it carries the feed key for
//! the authentication header and nothing else. Expected failures (auth
//! rejection, server errors, transport faults) never surface as `Err`;
//! the call yields no result and the human-readable message is routed to
//! the notice sink. Callers must treat "no result" as "not yet
//! published", never as a permanent failure.

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::notices::NoticeSink;

/// Authentication header carrying the feed key on every call.
pub const FEED_KEY_HEADER: &str = "X-Minifeed-Feed-Key";

/// Identity verification route.
pub const VERIFY_ENDPOINT: &str = "verifyminifeed";

/// Publication route.
pub const PUBLISH_ENDPOINT: &str = "minifeed";

/// Notice text for a 403 response.
pub const AUTH_FAILURE_NOTICE: &str =
    "There was an error authenticating, please check your Feed Key.";

/// Notice text for a 500 response.
pub const SERVER_FAILURE_NOTICE: &str = "There was an error contacting the API server.";

// Transport timeout; a stuck call blocks only its own save or render
// request, so a generous bound is fine.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Successful body of `GET verifyminifeed`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResponse {
    pub gcid: String,
}

/// Successful body of `POST minifeed`: the remote post identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishResponse {
    pub id: String,
}

pub struct MinifeedClient {
    http: reqwest::Client,
    base_url: String,
    feedkey: String,
    notices: NoticeSink,
}

impl MinifeedClient {
    pub fn new(base_url: String, feedkey: String, notices: NoticeSink) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            feedkey,
            notices,
        }
    }

    /// Issue an authenticated call and classify the outcome.
    ///
    /// Status contract: 200 yields the parsed JSON body; 403 and 500 yield
    /// nothing and record their fixed notice; any other status is a
    /// generic failure with no notice, logged at debug. Transport errors
    /// record the underlying error text.
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<String>,
    ) -> Option<serde_json::Value> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);

        let mut request = self
            .http
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json")
            .header(FEED_KEY_HEADER, &self.feedkey)
            .timeout(REQUEST_TIMEOUT);
        if let Some(body) = body {
            request = request.header(CONTENT_LENGTH, body.len()).body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.notices
                    .record(&format!("A transport error occurred: {}", e))
                    .await;
                return None;
            }
        };

        match response.status() {
            StatusCode::OK => match response.json::<serde_json::Value>().await {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(%url, error = %e, "API returned 200 with an unparseable body");
                    None
                }
            },
            StatusCode::FORBIDDEN => {
                self.notices.record(AUTH_FAILURE_NOTICE).await;
                None
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                self.notices.record(SERVER_FAILURE_NOTICE).await;
                None
            }
            status => {
                debug!(%url, %status, "unclassified API status treated as generic failure");
                None
            }
        }
    }

    /// `GET verifyminifeed`: resolve the publisher identity for this feed key.
    pub async fn verify_minifeed(&self) -> Option<VerifyResponse> {
        let value = self.call(Method::GET, VERIFY_ENDPOINT, None).await?;
        match serde_json::from_value(value) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(error = %e, "verifyminifeed returned an unexpected body");
                None
            }
        }
    }

    /// `POST minifeed`: publish an already-serialized payload.
    pub async fn publish(&self, body: &str) -> Option<PublishResponse> {
        let value = self
            .call(Method::POST, PUBLISH_ENDPOINT, Some(body.to_string()))
            .await?;
        match serde_json::from_value(value) {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(error = %e, "minifeed returned an unexpected body");
                None
            }
        }
    }
}
