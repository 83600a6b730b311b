//! HTTP fetcher implementation
//!
//! This module handles the transport side of the harvest:
//! - The `Fetcher` trait the discoverer and workers fetch through
//! - Building the shared HTTP client (connection pool, timeouts, compression)
//! - Classifying transport failures
//!
//! Status codes are returned as-is; deciding which statuses are usable is
//! left to the caller so every fetcher implementation is judged the same way.

use crate::config::HttpConfig;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Raw document returned by a fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects, used to resolve relative links
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Page body content
    pub body: String,
}

/// Source of raw documents
///
/// Implementations must be shareable between the discoverer and every
/// worker; connection reuse is the implementation's concern.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a single URL
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, HarvestError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP transport configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use forum_harvest::config::HttpConfig;
/// use forum_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, HarvestError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(FetchedPage {
            url: final_url,
            status,
            body,
        })
    }
}

/// Maps a reqwest error onto the harvest error taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> HarvestError {
    if error.is_timeout() {
        HarvestError::Timeout {
            url: url.to_string(),
        }
    } else {
        HarvestError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
