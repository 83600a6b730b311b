use serde::Deserialize;
use std::path::PathBuf;

/// Forum index the harvest starts from when no URL is configured
pub const DEFAULT_ROOT_URL: &str =
    "https://legacywebsite.org/community/forums/8/?order=reply_count&direction=desc";

/// Main configuration structure for Forum-Harvest
///
/// Every section is optional in the TOML file; missing keys fall back to
/// the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub http: HttpConfig,
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
}

/// Crawl pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CrawlConfig {
    /// Index page the discoverer starts from
    pub url: String,

    /// Maximum number of index pages visited
    pub pages: u32,

    /// Number of worker tasks
    pub threads: u32,

    /// Optional cap on content pages followed per thread
    pub max_content_pages: Option<u32>,

    /// Optional work queue capacity; unbounded when absent
    pub queue_capacity: Option<usize>,

    /// Sleep for as long as each request took before issuing the next one
    pub throttle: bool,

    /// Extra attempts for server errors and timeouts
    pub max_retries: u32,

    /// Delay between retry attempts (milliseconds)
    pub retry_delay_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ROOT_URL.to_string(),
            pages: 20,
            threads: 8,
            max_content_pages: None,
            queue_capacity: None,
            throttle: true,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    pub connect_timeout_secs: u64,

    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("forum-harvest/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 16,
        }
    }
}

/// CSS selectors used to pick data out of index and thread pages
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SelectorConfig {
    /// Element wrapping a thread link on an index page; its first `a[href]` is used
    pub index_item: String,

    /// Link to the next page, on both index and thread pages
    pub next_page: String,

    /// Element holding the posts of a thread page
    pub content_container: String,

    /// One post inside the container
    pub message: String,

    /// Element holding the text of a post
    pub message_body: String,

    /// Attribute of the post element carrying the author name
    pub author_attribute: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            index_item: "div.structItem-title".to_string(),
            next_page: "a.pageNav-jump.pageNav-jump--next".to_string(),
            content_container: "div.block-body.js-replyNewMessageContainer".to_string(),
            message: "article.message.message--post.js-post.js-inlineModContainer".to_string(),
            message_body: "div.bbWrapper".to_string(),
            author_attribute: "data-author".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Path of the JSON result file
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("result.json"),
        }
    }
}
