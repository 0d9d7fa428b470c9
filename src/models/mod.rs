// src/models/mod.rs

//! Domain models for the stock scraper.

mod config;
mod selectors;
mod stock;

// Re-export all public types
pub use config::{CacheConfig, Config, FetcherConfig, LoggingConfig, ServerConfig};
pub use selectors::{PageSelectors, SelectorConfig, parse_selector};
pub use stock::{Category, CategorySnapshot, StockItem, StockSnapshot, UNKNOWN_COUNTDOWN};
