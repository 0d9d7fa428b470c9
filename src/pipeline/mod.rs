//! Pipeline entry points.
//!
//! - `StockScraper::fetch_stock_snapshot`: fetch the live page and extract stock
//! - `StockParser::parse`: extract stock from HTML already on hand
//! - `SnapshotCache`: share one snapshot per time bucket between callers

pub mod cache;
pub mod scrape;

pub use cache::{SnapshotCache, SnapshotSource};
pub use scrape::{StockParser, StockScraper};
