use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LIST_URL: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_ANALYTICS_URL: &str = "http://localhost:8081/event";
pub const DEFAULT_PAGE_SIZE: usize = 15;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
const DEFAULT_POLL_MS: u64 = 250;
const DEFAULT_STATE_DIR: &str = "./data/scrollfeed-state";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub list_url: String,
    pub analytics_url: String,
    pub page_size: usize,
    pub http_timeout: Duration,
    pub poll_interval: Duration,
    pub state_dir: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            list_url: DEFAULT_LIST_URL.to_owned(),
            analytics_url: DEFAULT_ANALYTICS_URL.to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup. Unset or unparsable values
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |name: &str| {
            lookup(name)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .filter(|value| *value > 0)
        };

        Self {
            list_url: lookup("SCROLLFEED_LIST_URL").unwrap_or(defaults.list_url),
            analytics_url: lookup("SCROLLFEED_ANALYTICS_URL").unwrap_or(defaults.analytics_url),
            page_size: number("SCROLLFEED_PAGE_SIZE")
                .map(|size| size as usize)
                .unwrap_or(defaults.page_size),
            http_timeout: number("SCROLLFEED_HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            poll_interval: number("SCROLLFEED_POLL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            state_dir: lookup("SCROLLFEED_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_dir),
        }
    }
}
