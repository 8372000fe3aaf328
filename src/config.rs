use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.ebay.com/sch/i.html";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36 Edg/113.0.1774.35";

/// Process-wide settings, read once at startup and handed to the fetcher
/// and paginator.
#[derive(Debug, Clone)]
pub struct Config {
    pub search_base_url: String,
    pub fetcher: FetcherConfig,
    /// `None` lets every remaining page run at once.
    pub max_concurrency: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub max_redirects: usize,
    /// Honour HTTP_PROXY / HTTPS_PROXY / NO_PROXY from the environment.
    pub use_env_proxy: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            accept_encoding: "gzip, deflate, br".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            use_env_proxy: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            fetcher: FetcherConfig::default(),
            max_concurrency: None,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads overrides from the environment.
    pub fn from_env() -> Config {
        dotenv().ok();
        let defaults = FetcherConfig::default();
        let max_concurrency: usize = get_env_parsed("MAX_CONCURRENCY", 0);
        Config {
            search_base_url: get_env_or_default("SEARCH_BASE_URL", DEFAULT_SEARCH_BASE_URL),
            fetcher: FetcherConfig {
                user_agent: get_env_or_default("USER_AGENT", &defaults.user_agent),
                request_timeout: Duration::from_secs(get_env_parsed(
                    "REQUEST_TIMEOUT_SECS",
                    defaults.request_timeout.as_secs(),
                )),
                connect_timeout: Duration::from_secs(get_env_parsed(
                    "CONNECT_TIMEOUT_SECS",
                    defaults.connect_timeout.as_secs(),
                )),
                max_redirects: get_env_parsed("MAX_REDIRECTS", defaults.max_redirects),
                use_env_proxy: get_env_parsed("USE_ENV_PROXY", defaults.use_env_proxy),
                ..defaults
            },
            max_concurrency: (max_concurrency > 0).then_some(max_concurrency),
        }
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring unparseable {key}={raw:?}, using default");
            default
        }),
        Err(_) => default,
    }
}
