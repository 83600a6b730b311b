//! Page source: one fetch, timed, throttled, checked and extracted
//!
//! Every request made by the discoverer or a worker goes through
//! `PageSource`, which:
//! - times the transport and sleeps for the same duration afterwards
//! - rejects non-2xx statuses
//! - times extraction and logs one `REQUEST:<id>:{...}` line per response,
//!   error statuses included
//! - retries server errors and timeouts when configured to
//!
//! The throttle is per call: a slow response delays only the task that
//! issued it, so aggregate request rate grows with the pool size.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{ContentPage, Extractor, IndexPage};
use crate::HarvestError;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Per-request timing record, logged as compact JSON
#[derive(Debug, Serialize)]
struct RequestStats<'a> {
    transport_seconds: f64,
    status: u16,
    parse_seconds: f64,
    url: &'a str,
}

impl RequestStats<'_> {
    fn log(&self, requester: &str) -> Result<(), HarvestError> {
        tracing::info!("REQUEST:{}:{}", requester, serde_json::to_string(self)?);
        Ok(())
    }
}

/// Shared fetch-and-extract front end for discoverer and workers
pub struct PageSource {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    throttle: bool,
    max_retries: u32,
    retry_delay: Duration,
}

impl PageSource {
    /// Creates a page source with throttling on and no retries
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            fetcher,
            extractor,
            throttle: true,
            max_retries: 0,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Enables or disables the latency-proportional sleep
    pub fn with_throttle(mut self, throttle: bool) -> Self {
        self.throttle = throttle;
        self
    }

    /// Sets the number of extra attempts for retryable failures
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Fetches and extracts an index page
    ///
    /// `requester` names the caller in log lines (`P` for the producer,
    /// the worker id for consumers).
    pub async fn index_page(&self, url: &Url, requester: &str) -> Result<IndexPage, HarvestError> {
        self.fetch_document(url, requester, |extractor, html, page_url| {
            extractor.extract_index(html, page_url)
        })
        .await
    }

    /// Fetches and extracts one page of a thread
    pub async fn content_page(
        &self,
        url: &Url,
        requester: &str,
    ) -> Result<ContentPage, HarvestError> {
        self.fetch_document(url, requester, |extractor, html, page_url| {
            extractor.extract_content(html, page_url)
        })
        .await
    }

    async fn fetch_document<T, F>(
        &self,
        url: &Url,
        requester: &str,
        extract: F,
    ) -> Result<T, HarvestError>
    where
        F: Fn(&dyn Extractor, &str, &Url) -> Result<T, String>,
    {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url, requester, &extract).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "REQUEST:{}:RETRY:{}/{} after error: {}",
                        requester,
                        attempt,
                        self.max_retries,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                outcome => return outcome,
            }
        }
    }

    async fn fetch_once<T, F>(&self, url: &Url, requester: &str, extract: &F) -> Result<T, HarvestError>
    where
        F: Fn(&dyn Extractor, &str, &Url) -> Result<T, String>,
    {
        let start = Instant::now();
        let fetched = self.fetcher.fetch(url).await;
        let transport = start.elapsed();

        if self.throttle {
            tokio::time::sleep(transport).await;
        }

        let page = fetched?;

        if !(200..300).contains(&page.status) {
            tracing::error!(
                "REQUEST:{}:ERROR:Received HTTP {} on {}",
                requester,
                page.status,
                url
            );
            RequestStats {
                transport_seconds: transport.as_secs_f64(),
                status: page.status,
                parse_seconds: 0.0,
                url: url.as_str(),
            }
            .log(requester)?;
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: page.status,
            });
        }

        let parse_start = Instant::now();
        let extracted = extract(self.extractor.as_ref(), &page.body, &page.url);
        let parse = parse_start.elapsed();

        RequestStats {
            transport_seconds: transport.as_secs_f64(),
            status: page.status,
            parse_seconds: parse.as_secs_f64(),
            url: url.as_str(),
        }
        .log(requester)?;

        extracted.map_err(|message| HarvestError::Extract {
            url: url.to_string(),
            message,
        })
    }
}
