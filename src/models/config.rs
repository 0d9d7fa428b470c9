//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SelectorConfig;
use crate::utils::http::is_usable_user_agent;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP fetching behavior
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Page structure patterns
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Snapshot cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP API settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.fetcher.url)?;
        if self.fetcher.user_agents.is_empty() {
            return Err(AppError::validation("fetcher.user_agents is empty"));
        }
        let unusable = self
            .fetcher
            .user_agents
            .iter()
            .find(|ua| !is_usable_user_agent(ua));
        if let Some(ua) = unusable {
            return Err(AppError::validation(format!(
                "fetcher.user_agents contains an unusable entry {ua:?}"
            )));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        if self.fetcher.max_attempts == 0 {
            return Err(AppError::validation("fetcher.max_attempts must be > 0"));
        }
        if self.fetcher.cache_bust_param.trim().is_empty() {
            return Err(AppError::validation("fetcher.cache_bust_param is empty"));
        }
        if self.cache.bucket_secs == 0 {
            return Err(AppError::validation("cache.bucket_secs must be > 0"));
        }
        if self.server.requests_per_minute == 0 {
            return Err(AppError::validation(
                "server.requests_per_minute must be > 0",
            ));
        }
        self.selectors.compile()?;
        Ok(())
    }
}

/// HTTP client and retry behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Stock page URL
    #[serde(default = "defaults::url")]
    pub url: String,

    /// Browser User-Agent strings rotated between attempts
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    /// Per-attempt timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Total attempts including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Delay between failed attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Delay before every request in milliseconds
    #[serde(default = "defaults::pre_request_delay")]
    pub pre_request_delay_ms: u64,

    /// Query parameter carrying the cache-busting timestamp
    #[serde(default = "defaults::cache_bust_param")]
    pub cache_bust_param: String,

    /// Return `Blocked` on the first challenge page instead of retrying
    #[serde(default = "defaults::fail_fast_on_challenge")]
    pub fail_fast_on_challenge: bool,

    /// Case-insensitive phrases identifying a challenge page
    #[serde(default = "defaults::challenge_markers")]
    pub challenge_markers: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            url: defaults::url(),
            user_agents: defaults::user_agents(),
            timeout_secs: defaults::timeout(),
            max_attempts: defaults::max_attempts(),
            retry_delay_ms: defaults::retry_delay(),
            pre_request_delay_ms: defaults::pre_request_delay(),
            cache_bust_param: defaults::cache_bust_param(),
            fail_fast_on_challenge: defaults::fail_fast_on_challenge(),
            challenge_markers: defaults::challenge_markers(),
        }
    }
}

/// Snapshot cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Width of one cache time bucket in seconds
    #[serde(default = "defaults::bucket_secs")]
    pub bucket_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            bucket_secs: defaults::bucket_secs(),
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// Requests allowed per client per minute
    #[serde(default = "defaults::requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            requests_per_minute: defaults::requests_per_minute(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level: debug, info, warn, error
    #[serde(default = "defaults::level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
        }
    }
}

mod defaults {
    // Fetcher defaults
    pub fn url() -> String {
        "https://vulcanvalues.com/grow-a-garden/stock".into()
    }
    pub fn user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".into(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0".into(),
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".into(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.80".into(),
        ]
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        5000
    }
    pub fn pre_request_delay() -> u64 {
        2000
    }
    pub fn cache_bust_param() -> String {
        "t".into()
    }
    pub fn fail_fast_on_challenge() -> bool {
        true
    }
    pub fn challenge_markers() -> Vec<String> {
        vec![
            "just a moment".into(),
            "checking your browser".into(),
            "cf-browser-verification".into(),
            "cf-challenge".into(),
            "challenge-platform".into(),
            "attention required".into(),
            "verify you are human".into(),
            "enable javascript and cookies to continue".into(),
            "ddos protection by".into(),
        ]
    }

    // Cache defaults
    pub fn bucket_secs() -> u64 {
        300
    }

    // Server defaults
    pub fn bind() -> String {
        "127.0.0.1:5000".into()
    }
    pub fn requests_per_minute() -> u32 {
        10
    }

    // Logging defaults
    pub fn level() -> String {
        "info".into()
    }
}
