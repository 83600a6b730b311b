//! Fixture fetcher and markup builders shared by the crawler unit tests

use crate::config::SelectorConfig;
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::parser::{Extractor, ForumExtractor};
use crate::HarvestError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub(crate) const BASE: &str = "https://forum.example.com";

pub(crate) fn url(path: &str) -> Url {
    Url::parse(&format!("{}{}", BASE, path)).unwrap()
}

pub(crate) fn forum_extractor() -> Arc<dyn Extractor> {
    Arc::new(ForumExtractor::new(&SelectorConfig::default()).unwrap())
}

/// Index page markup listing `items` and an optional next link
pub(crate) fn index_html(items: &[&str], next: Option<&str>) -> String {
    let mut html = String::from("<html><body>");
    for item in items {
        html.push_str(&format!(
            r#"<div class="structItem-title"><a href="{}">thread</a></div>"#,
            item
        ));
    }
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<a class="pageNav-jump pageNav-jump--next" href="{}">Next</a>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Thread page markup with `(author, text)` posts and an optional next link
pub(crate) fn content_html(posts: &[(&str, &str)], next: Option<&str>) -> String {
    let mut html =
        String::from(r#"<html><body><div class="block-body js-replyNewMessageContainer">"#);
    for (author, text) in posts {
        html.push_str(&format!(
            r#"<article class="message message--post js-post js-inlineModContainer" data-author="{}"><div class="bbWrapper">{}</div></article>"#,
            author, text
        ));
    }
    html.push_str("</div>");
    if let Some(next) = next {
        html.push_str(&format!(
            r#"<a class="pageNav-jump pageNav-jump--next" href="{}">Next</a>"#,
            next
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Formatted log output captured from a thread-local subscriber
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Routes this thread's log records here until the guard drops
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_target(false)
            .without_time()
            .with_writer(move || logs.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Parses the JSON object that follows `prefix` on each matching line
    ///
    /// `prefix` must end with the opening `{` of the record.
    pub(crate) fn records(&self, prefix: &str) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .filter_map(|line| {
                let start = line.find(prefix)? + prefix.len() - 1;
                serde_json::from_str(&line[start..]).ok()
            })
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct FixtureResponse {
    status: u16,
    body: String,
    delay: Duration,
}

/// In-memory `Fetcher` keyed by URL path
///
/// Each path holds a list of responses served in order; the last one
/// repeats. Unknown paths answer 404.
#[derive(Default)]
pub(crate) struct FixtureFetcher {
    routes: HashMap<String, Vec<FixtureResponse>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl FixtureFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(self, path: &str, body: String) -> Self {
        self.page_with_delay(path, body, Duration::ZERO)
    }

    pub(crate) fn page_with_delay(self, path: &str, body: String, delay: Duration) -> Self {
        self.respond(path, 200, body, delay)
    }

    pub(crate) fn status(self, path: &str, status: u16) -> Self {
        self.respond(path, status, String::new(), Duration::ZERO)
    }

    fn respond(mut self, path: &str, status: u16, body: String, delay: Duration) -> Self {
        self.routes
            .entry(path.to_string())
            .or_default()
            .push(FixtureResponse {
                status,
                body,
                delay,
            });
        self
    }

    pub(crate) fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, HarvestError> {
        let path = url.path().to_string();
        let attempt = {
            let mut hits = self.hits.lock().unwrap();
            let count = hits.entry(path.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };

        let Some(responses) = self.routes.get(&path) else {
            return Ok(FetchedPage {
                url: url.clone(),
                status: 404,
                body: String::new(),
            });
        };

        let response = responses
            .get(attempt)
            .or_else(|| responses.last())
            .unwrap();

        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }

        Ok(FetchedPage {
            url: url.clone(),
            status: response.status,
            body: response.body.clone(),
        })
    }
}
