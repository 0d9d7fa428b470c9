// src/error.rs

//! Unified error handling for the stock scraper.
//!
//! [`FetchError`] is the typed outcome of a failed pipeline run and is what
//! callers (CLI, HTTP API) report. [`AppError`] covers everything around the
//! pipeline: configuration, I/O, serialization.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failure of a single `fetch_stock_snapshot` run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure, timeout or non-2xx status after all retries
    #[error("Network error: {0}")]
    Network(String),

    /// Anti-bot challenge page detected
    #[error("Blocked by anti-bot protection: {0}")]
    Blocked(String),

    /// Expected page structure missing even after fallbacks
    #[error("Page structure error: {0}")]
    Structure(String),

    /// Page parsed but no stock items were found
    #[error("No stock data found: {0}")]
    EmptyResult(String),
}

impl FetchError {
    pub fn network(detail: impl fmt::Display) -> Self {
        Self::Network(detail.to_string())
    }

    pub fn blocked(detail: impl fmt::Display) -> Self {
        Self::Blocked(detail.to_string())
    }

    pub fn structure(detail: impl fmt::Display) -> Self {
        Self::Structure(detail.to_string())
    }

    pub fn empty(detail: impl fmt::Display) -> Self {
        Self::EmptyResult(detail.to_string())
    }

    /// Stable tag used in serialized error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network_error",
            Self::Blocked(_) => "blocked",
            Self::Structure(_) => "structure_error",
            Self::EmptyResult(_) => "empty_result",
        }
    }

    /// Detail string carried by the variant.
    pub fn detail(&self) -> &str {
        match self {
            Self::Network(d) | Self::Blocked(d) | Self::Structure(d) | Self::EmptyResult(d) => d,
        }
    }

    /// Remediation hint shown to API consumers.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Network(_) => Some("The stock page could not be reached. Try again in a minute."),
            Self::Blocked(_) => Some(
                "The stock page is serving a browser verification challenge. \
                 Wait a few minutes before retrying or open the page in a browser.",
            ),
            Self::Structure(_) => {
                Some("The stock page layout has changed; the selectors need updating.")
            }
            Self::EmptyResult(_) => {
                Some("The stock page returned placeholder content. Try again after the next restock.")
            }
        }
    }

    /// Build the serializable error envelope.
    pub fn to_body(&self) -> ErrorBody {
        let summary = match self {
            Self::Network(_) => "Failed to fetch stock page",
            Self::Blocked(_) => "Blocked by anti-bot protection",
            Self::Structure(_) => "Unexpected stock page structure",
            Self::EmptyResult(_) => "No stock data found",
        };

        ErrorBody {
            error: summary.to_string(),
            kind: Some(self.kind().to_string()),
            details: Some(self.detail().to_string()).filter(|d| !d.is_empty()),
            suggestion: self.suggestion().map(str::to_string),
        }
    }
}

/// JSON error envelope: `{error, kind?, details?, suggestion?}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ErrorBody {
    /// Plain error body without a pipeline error behind it.
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: None,
            details: None,
            suggestion: None,
        }
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Pipeline failure
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regex compilation failed
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
