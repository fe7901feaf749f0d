//! Watch page fetcher
//!
//! This module defines the [`PageFetcher`] capability consumed by the crawl
//! workers and its production implementation over HTTP, including:
//! - Building the HTTP client with browser-like headers
//! - Requesting the watch page for a seed identifier
//! - Error classification (timeout, HTTP status, transport)
//! - Handing the body to the parser for link harvesting

use crate::config::FetcherConfig;
use crate::crawler::parser::extract_video_links;
use crate::identifier::VideoId;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a single seed's page could not be fetched
///
/// Fetch errors are contained at the per-seed boundary: the seed contributes
/// no links and its siblings in the batch are unaffected.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Fetch of {id} timed out after {after:?}")]
    Timeout { id: VideoId, after: Duration },

    #[error("HTTP {status} for {id}")]
    Status { id: VideoId, status: u16 },

    #[error("Request for {id} failed: {source}")]
    Request {
        id: VideoId,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetch of {id} failed: {message}")]
    Other { id: VideoId, message: String },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Capability that turns a seed identifier into the raw video hrefs on its page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the seed's watch page and returns every outbound video href
    async fn fetch_video_links(&self, id: &VideoId) -> Result<Vec<String>, FetchError>;

    /// Releases pooled resources; called once by the supervisor after all
    /// workers have stopped
    async fn close(&self) {}
}

/// Builds an HTTP client for watch page requests
///
/// # Arguments
///
/// * `config` - The fetcher configuration
/// * `request_timeout` - Upper bound for a whole request, body included
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    config: &FetcherConfig,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, language);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Production fetcher: plain HTTP GET of the watch page
///
/// Only the HTML document is requested, so images, stylesheets and other page
/// assets are never downloaded. The client (and its connection pool) is
/// dropped by [`PageFetcher::close`]; fetches after that fail.
pub struct HttpPageFetcher {
    client: RwLock<Option<Client>>,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpPageFetcher {
    /// Creates a fetcher from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the client cannot be built
    pub fn new(config: &FetcherConfig, request_timeout: Duration) -> Result<Self, crate::CrawlError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            crate::ConfigError::Validation(format!("Invalid base_url '{}': {}", config.base_url, e))
        })?;
        let client = build_http_client(config, request_timeout)?;

        Ok(Self {
            client: RwLock::new(Some(client)),
            base_url,
            request_timeout,
        })
    }

    /// Watch page URL for `id` on the configured origin
    pub fn watch_url(&self, id: &VideoId) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("/watch");
        url.query_pairs_mut().clear().append_pair("v", id.as_str());
        url
    }

    fn client(&self) -> Option<Client> {
        self.client.read().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_video_links(&self, id: &VideoId) -> Result<Vec<String>, FetchError> {
        let client = self.client().ok_or_else(|| FetchError::Other {
            id: id.clone(),
            message: "fetcher is closed".to_string(),
        })?;

        let url = self.watch_url(id);
        tracing::trace!("Fetching watch page {}", url);

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    id: id.clone(),
                    after: self.request_timeout,
                }
            } else {
                FetchError::Request {
                    id: id.clone(),
                    source: e,
                }
            }
        };

        let response = client.get(url.clone()).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                id: id.clone(),
                status: status.as_u16(),
            });
        }

        // Redirects (consent pages, regional hosts) change the base for relative links
        let final_url = response.url().clone();
        let body = response.text().await.map_err(classify)?;

        let links = extract_video_links(&body, &final_url);
        tracing::debug!("{} yielded {} video links", id, links.len());
        Ok(links)
    }

    async fn close(&self) {
        if let Ok(mut guard) = self.client.write() {
            if guard.take().is_some() {
                tracing::debug!("HTTP page fetcher closed");
            }
        }
    }
}
