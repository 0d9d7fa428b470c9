// src/utils/http.rs

//! HTTP client utilities.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use url::Url;

use crate::error::Result;
use crate::models::FetcherConfig;

/// Create a configured asynchronous HTTP client.
///
/// The User-Agent is set per request, so none is configured here.
pub fn create_async_client(config: &FetcherConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Headers a desktop browser sends on a top-level navigation.
///
/// `Accept-Encoding` is left to reqwest so responses are decompressed.
pub fn browser_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(header::USER_AGENT, value);
    }
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers
}

/// Append `param=<unix millis>` so intermediate caches are bypassed.
pub fn cache_busted_url(base: &str, param: &str, now: DateTime<Utc>) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut()
        .append_pair(param, &now.timestamp_millis().to_string());
    Ok(url)
}

/// Parse an HTTP `Date` header value (RFC 2822 / IMF-fixdate).
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whether `ua` can be sent as a `User-Agent` header.
pub fn is_usable_user_agent(ua: &str) -> bool {
    let ua = ua.trim();
    !ua.is_empty() && HeaderValue::from_str(ua).is_ok()
}

/// Rotating pool of User-Agent strings.
///
/// Starts at a random entry; [`UserAgentPool::rotate`] advances to the next.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl UserAgentPool {
    /// Blank entries and entries that are not valid header values are
    /// dropped.
    pub fn new(agents: Vec<String>) -> Self {
        let agents: Vec<String> = agents
            .into_iter()
            .map(|ua| ua.trim().to_string())
            .filter(|ua| is_usable_user_agent(ua))
            .collect();
        let start = if agents.len() > 1 {
            rand::rng().random_range(0..agents.len())
        } else {
            0
        };
        Self {
            agents,
            cursor: AtomicUsize::new(start),
        }
    }

    /// Current User-Agent, or an empty string for an empty pool.
    pub fn current(&self) -> &str {
        if self.agents.is_empty() {
            return "";
        }
        let idx = self.cursor.load(Ordering::Relaxed) % self.agents.len();
        &self.agents[idx]
    }

    /// Move to the next User-Agent and return it.
    pub fn rotate(&self) -> &str {
        self.cursor.fetch_add(1, Ordering::Relaxed);
        self.current()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
