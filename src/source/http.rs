//! HTTP implementation of the playback source

use super::types::HistoryPage;
use crate::auth::AuthConfig;
use crate::config::ConnectorConfig;
use crate::error::Result;
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RequestConfig};
use crate::offset::CursorState;
use async_trait::async_trait;

/// Path of the recently-played endpoint, relative to the API base URL
const RECENTLY_PLAYED_PATH: &str = "/me/recently-played";

/// A source of playback-history pages.
///
/// `fetch` must request events strictly after the given cursor and return an
/// empty page when there is nothing new. Transport retries are internal to
/// one fetch: callers see either a page or a single error per call, never
/// partial output.
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    /// Fetch one page of events played strictly after `cursor`
    async fn fetch(&self, cursor: CursorState) -> Result<HistoryPage>;
}

/// Playback source backed by the HTTP API
#[derive(Debug)]
pub struct HttpPlaybackSource {
    client: HttpClient,
    page_limit: u32,
}

impl HttpPlaybackSource {
    /// Create a source over an already-configured HTTP client
    pub fn new(client: HttpClient, page_limit: u32) -> Self {
        Self { client, page_limit }
    }

    /// Build a source from connector configuration.
    ///
    /// Credentials pass through opaquely; the source neither inspects nor
    /// logs them.
    pub fn from_config(config: &ConnectorConfig) -> Result<Self> {
        let auth = AuthConfig::from_settings(&config.auth)?;

        let mut builder = HttpClientConfig::builder()
            .base_url(config.api.base_url.clone())
            .timeout(config.api.timeout)
            .max_retries(config.api.max_retries);

        builder = if config.api.requests_per_second == 0 {
            builder.no_rate_limit()
        } else {
            builder.rate_limit(RateLimiterConfig::per_second(
                config.api.requests_per_second,
            ))
        };

        let client = HttpClient::with_auth(builder.build(), auth);
        Ok(Self::new(client, config.api.page_limit))
    }
}

#[async_trait]
impl PlaybackSource for HttpPlaybackSource {
    async fn fetch(&self, cursor: CursorState) -> Result<HistoryPage> {
        let request = RequestConfig::new()
            .query("after", cursor.millis().to_string())
            .query("limit", self.page_limit.to_string());

        self.client
            .get_json_with_config(RECENTLY_PLAYED_PATH, request)
            .await
    }
}
