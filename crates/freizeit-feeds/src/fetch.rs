//! HTTP fetching for calendar and status feeds.
//!
//! One shared reqwest client with a timeout and user agent; sources are
//! fetched concurrently and each failure stays isolated to its own
//! source.

use std::time::Duration;

use futures_util::future::join_all;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FeedError, FeedResult};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent sent to feed servers.
pub const DEFAULT_USER_AGENT: &str = concat!("freizeit/", env!("CARGO_PKG_VERSION"));

/// HTTP fetcher for feed sources.
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    /// Creates a fetcher with the default timeout and user agent.
    pub fn new() -> FeedResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| FeedError::internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetches one feed and returns its body as text.
    ///
    /// Non-success HTTP statuses are [`FeedError::unavailable`], like
    /// connection failures and timeouts.
    pub async fn fetch(&self, url: &Url) -> FeedResult<String> {
        debug!(url = %url, "fetching feed");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                FeedError::unavailable(format!("request failed: {e}"))
                    .with_source_id(url.as_str())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                FeedError::unavailable(format!("HTTP {status}")).with_source_id(url.as_str())
            );
        }

        response.text().await.map_err(|e| {
            FeedError::unavailable(format!("failed to read body: {e}"))
                .with_source_id(url.as_str())
        })
    }

    /// Fetches all feeds concurrently.
    ///
    /// Every source gets its own result; a failed fetch is logged here
    /// and returned for the caller to count, never propagated across
    /// sources.
    pub async fn fetch_all(&self, urls: &[Url]) -> Vec<(Url, FeedResult<String>)> {
        let fetches = urls.iter().map(|url| async move {
            let result = self.fetch(url).await;
            if let Err(ref error) = result {
                warn!(url = %url, error = %error, "feed fetch failed");
            }
            (url.clone(), result)
        });
        join_all(fetches).await
    }
}
