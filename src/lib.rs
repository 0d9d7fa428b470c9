// src/lib.rs

//! Grow A Garden stock scraper library.
//!
//! Fetches the shop stock page and extracts gear, egg and seed stock with
//! restock countdowns. See [`pipeline::StockScraper::fetch_stock_snapshot`].

#[cfg(feature = "server")]
pub mod api;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod utils;

pub use error::{AppError, ErrorBody, FetchError, Result};
pub use models::{Category, CategorySnapshot, Config, StockItem, StockSnapshot};
pub use pipeline::{SnapshotCache, SnapshotSource, StockParser, StockScraper};
