//! HTML extraction for index and thread pages
//!
//! This module turns raw forum markup into:
//! - Thread references on an index page, in document order
//! - Posts (author/text pairs) on a thread page, in document order
//! - The "next page" link of either kind of page

use crate::config::SelectorConfig;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// One post extracted from a thread page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFragment {
    pub author: String,

    #[serde(rename = "txt")]
    pub text: String,
}

impl ContentFragment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }
}

/// Extracted information from an index page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexPage {
    /// Thread URLs in document order (absolute)
    pub items: Vec<Url>,

    /// Next index page, if any
    pub next_page: Option<Url>,
}

/// Extracted information from one page of a thread
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentPage {
    /// Posts in document order
    pub fragments: Vec<ContentFragment>,

    /// Next page of the same thread, if any
    pub next_page: Option<Url>,
}

/// Turns raw documents into index and content pages
///
/// Errors are plain messages; the caller attaches the page URL.
pub trait Extractor: Send + Sync {
    /// Extracts thread references and the next index page link
    fn extract_index(&self, html: &str, page_url: &Url) -> Result<IndexPage, String>;

    /// Extracts posts and the next thread page link
    fn extract_content(&self, html: &str, page_url: &Url) -> Result<ContentPage, String>;
}

/// `Extractor` for XenForo-style forum markup, driven by CSS selectors
#[derive(Debug, Clone)]
pub struct ForumExtractor {
    index_item: Selector,
    item_link: Selector,
    next_page: Selector,
    content_container: Selector,
    message: Selector,
    message_body: Selector,
    author_attribute: String,
}

impl ForumExtractor {
    /// Compiles the configured selectors
    ///
    /// # Returns
    ///
    /// * `Ok(ForumExtractor)` - All selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - A selector failed to parse
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            index_item: compile(&config.index_item)?,
            item_link: compile("a[href]")?,
            next_page: compile(&config.next_page)?,
            content_container: compile(&config.content_container)?,
            message: compile(&config.message)?,
            message_body: compile(&config.message_body)?,
            author_attribute: config.author_attribute.clone(),
        })
    }

    fn find_next_page(&self, document: &Html, page_url: &Url) -> Option<Url> {
        document
            .select(&self.next_page)
            .find_map(|element| element.value().attr("href"))
            .and_then(|href| resolve_link(href, page_url))
    }

    fn extract_fragment(&self, article: ElementRef<'_>) -> Result<ContentFragment, String> {
        let author = article
            .value()
            .attr(&self.author_attribute)
            .unwrap_or_default();

        let body = article
            .select(&self.message_body)
            .next()
            .ok_or_else(|| format!("post by '{}' has no message body", author))?;

        Ok(ContentFragment::new(author, body.text().collect::<String>()))
    }
}

impl Extractor for ForumExtractor {
    fn extract_index(&self, html: &str, page_url: &Url) -> Result<IndexPage, String> {
        let document = Html::parse_document(html);

        let mut items = Vec::new();
        for element in document.select(&self.index_item) {
            let href = element
                .select(&self.item_link)
                .next()
                .and_then(|link| link.value().attr("href"));

            match href.and_then(|href| resolve_link(href, page_url)) {
                Some(url) => items.push(url),
                None => tracing::debug!("Index entry without usable link on {}", page_url),
            }
        }

        Ok(IndexPage {
            items,
            next_page: self.find_next_page(&document, page_url),
        })
    }

    fn extract_content(&self, html: &str, page_url: &Url) -> Result<ContentPage, String> {
        let document = Html::parse_document(html);

        let container = document
            .select(&self.content_container)
            .next()
            .ok_or_else(|| "message container not found".to_string())?;

        let fragments = container
            .select(&self.message)
            .map(|article| self.extract_fragment(article))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ContentPage {
            fragments,
            next_page: self.find_next_page(&document, page_url),
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be ignored:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel:, data: schemes
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}
