// src/services/fetcher.rs

//! Stock page fetcher.
//!
//! Each attempt waits the pre-request delay, sends browser-like headers with
//! a cache-busting query parameter, and checks the response for a non-2xx
//! status, a non-HTML content type and challenge-page markers. Failed
//! attempts wait the retry delay and switch to the next User-Agent.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, DATE};

use crate::error::{AppError, FetchError, Result};
use crate::models::FetcherConfig;
use crate::utils::http::{
    UserAgentPool, browser_headers, cache_busted_url, create_async_client, parse_http_date,
};
use crate::utils::log::{EventSink, PipelineEvent};

/// A successfully fetched stock page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub status: u16,
    /// Parsed `Date` response header
    pub server_time: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
}

/// Why a single attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AttemptFailure {
    Transport(String),
    Status(u16),
    ContentType(String),
    Challenge(String),
}

impl AttemptFailure {
    fn describe(&self) -> String {
        match self {
            AttemptFailure::Transport(detail) => detail.clone(),
            AttemptFailure::Status(code) => format!("HTTP status {code}"),
            AttemptFailure::ContentType(ct) => format!("unexpected content type '{ct}'"),
            AttemptFailure::Challenge(marker) => format!("challenge page (marker '{marker}')"),
        }
    }

    /// Error reported once no attempt is left.
    fn into_error(self, attempts: u32) -> FetchError {
        let detail = format!("{} after {attempts} attempt(s)", self.describe());
        match self {
            AttemptFailure::Transport(_) | AttemptFailure::Status(_) => FetchError::network(detail),
            AttemptFailure::ContentType(_) | AttemptFailure::Challenge(_) => {
                FetchError::blocked(detail)
            }
        }
    }
}

/// Fetches the stock page with retries.
pub struct PageFetcher {
    config: FetcherConfig,
    client: Client,
    user_agents: UserAgentPool,
    markers: Vec<String>,
    events: Arc<dyn EventSink>,
}

impl PageFetcher {
    /// Create a fetcher. Fails if the URL does not parse, no User-Agent is
    /// configured or the client cannot be built.
    pub fn new(config: FetcherConfig, events: Arc<dyn EventSink>) -> Result<Self> {
        url::Url::parse(&config.url)?;
        let user_agents = UserAgentPool::new(config.user_agents.clone());
        if user_agents.is_empty() {
            return Err(AppError::config("fetcher needs at least one usable User-Agent"));
        }
        if user_agents.len() < config.user_agents.len() {
            log::warn!(
                "Ignoring {} unusable User-Agent entries",
                config.user_agents.len() - user_agents.len()
            );
        }
        let client = create_async_client(&config)?;
        let markers = config
            .challenge_markers
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();

        Ok(Self {
            user_agents,
            client,
            markers,
            config,
            events,
        })
    }

    /// Fetch the page, retrying up to `max_attempts` times.
    pub async fn fetch_page(&self) -> std::result::Result<FetchedPage, FetchError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_failure = AttemptFailure::Transport("no attempt made".to_string());

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.user_agents.rotate();
                sleep_ms(self.config.retry_delay_ms).await;
            }
            sleep_ms(self.config.pre_request_delay_ms).await;

            let user_agent = self.user_agents.current().to_string();
            self.events.record(PipelineEvent::AttemptStarted {
                attempt,
                max_attempts,
                user_agent: user_agent.clone(),
            });

            let failure = match self.attempt(&user_agent).await {
                Ok(page) => return Ok(page),
                Err(failure) => failure,
            };

            if let AttemptFailure::Challenge(marker) = &failure {
                self.events.record(PipelineEvent::ChallengeDetected {
                    attempt,
                    marker: marker.clone(),
                });
                if self.config.fail_fast_on_challenge {
                    return Err(failure.into_error(attempt));
                }
            } else {
                self.events.record(PipelineEvent::AttemptFailed {
                    attempt,
                    reason: failure.describe(),
                });
            }
            last_failure = failure;
        }

        Err(last_failure.into_error(max_attempts))
    }

    async fn attempt(&self, user_agent: &str) -> std::result::Result<FetchedPage, AttemptFailure> {
        let url = cache_busted_url(&self.config.url, &self.config.cache_bust_param, Utc::now())
            .map_err(|e| AttemptFailure::Transport(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .headers(browser_headers(user_agent))
            .send()
            .await
            .map_err(|e| AttemptFailure::Transport(e.to_string()))?;

        let status = response.status();
        let server_time = response
            .headers()
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let html = response
            .text()
            .await
            .map_err(|e| AttemptFailure::Transport(e.to_string()))?;

        if !status.is_success() {
            // Challenge pages are often served with an error status.
            if matches!(status.as_u16(), 403 | 429 | 503) {
                if let Some(marker) = self.find_challenge_marker(&html) {
                    return Err(AttemptFailure::Challenge(marker));
                }
            }
            return Err(AttemptFailure::Status(status.as_u16()));
        }

        let is_html = content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
        if !is_html {
            return Err(AttemptFailure::ContentType(
                content_type.unwrap_or_else(|| "missing".to_string()),
            ));
        }

        if let Some(marker) = self.find_challenge_marker(&html) {
            return Err(AttemptFailure::Challenge(marker));
        }

        self.events.record(PipelineEvent::PageFetched {
            status: status.as_u16(),
            bytes: html.len(),
        });

        Ok(FetchedPage {
            html,
            status: status.as_u16(),
            server_time,
            content_type,
        })
    }

    /// First configured marker found in the body, case-insensitively.
    fn find_challenge_marker(&self, body: &str) -> Option<String> {
        let lower = body.to_lowercase();
        self.markers
            .iter()
            .find(|marker| lower.contains(marker.as_str()))
            .cloned()
    }
}

async fn sleep_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
