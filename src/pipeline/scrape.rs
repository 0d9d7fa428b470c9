// src/pipeline/scrape.rs

//! Scrape-and-extract pipeline.
//!
//! Fetcher → Section Locator → Item Extractor + Countdown → Assembler.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;

use crate::error::{FetchError, Result};
use crate::models::{Config, PageSelectors, SelectorConfig, StockSnapshot};
use crate::pipeline::cache::SnapshotSource;
use crate::services::{
    Countdowns, PageFetcher, SectionLocator, SnapshotAssembler, compute_countdowns,
};
use crate::utils::log::EventSink;

/// Offline half of the pipeline: HTML in, snapshot out.
pub struct StockParser {
    locator: SectionLocator,
    assembler: SnapshotAssembler,
}

impl StockParser {
    pub fn new(selectors: Arc<PageSelectors>, events: Arc<dyn EventSink>) -> Self {
        Self {
            locator: SectionLocator::new(Arc::clone(&selectors), Arc::clone(&events)),
            assembler: SnapshotAssembler::new(selectors, events),
        }
    }

    /// Compile the selector configuration and build a parser.
    pub fn from_config(config: &SelectorConfig, events: Arc<dyn EventSink>) -> Result<Self> {
        Ok(Self::new(Arc::new(config.compile()?), events))
    }

    /// Access the locator, e.g. to register extra strategies.
    pub fn locator_mut(&mut self) -> &mut SectionLocator {
        &mut self.locator
    }

    /// Parse a page using schedule countdowns relative to `reference_time`.
    pub fn parse(
        &self,
        html: &str,
        reference_time: DateTime<Utc>,
    ) -> std::result::Result<StockSnapshot, FetchError> {
        self.parse_with_countdowns(html, &compute_countdowns(reference_time, None))
    }

    pub fn parse_with_countdowns(
        &self,
        html: &str,
        countdowns: &Countdowns,
    ) -> std::result::Result<StockSnapshot, FetchError> {
        let document = Html::parse_document(html);
        let sections = self.locator.locate_sections(&document)?;
        self.assembler.assemble(&sections, countdowns)
    }
}

/// Full pipeline: fetch the live page and extract a snapshot.
pub struct StockScraper {
    fetcher: PageFetcher,
    parser: StockParser,
}

impl StockScraper {
    /// Build from configuration.
    pub fn new(config: &Config, events: Arc<dyn EventSink>) -> Result<Self> {
        let fetcher = PageFetcher::new(config.fetcher.clone(), Arc::clone(&events))?;
        let parser = StockParser::from_config(&config.selectors, events)?;
        Ok(Self::from_parts(fetcher, parser))
    }

    pub fn from_parts(fetcher: PageFetcher, parser: StockParser) -> Self {
        Self { fetcher, parser }
    }

    pub fn parser(&self) -> &StockParser {
        &self.parser
    }

    /// Run one fetch and extraction.
    ///
    /// Countdowns use the response `Date` header when it parses, local
    /// time otherwise.
    pub async fn fetch_stock_snapshot(&self) -> std::result::Result<StockSnapshot, FetchError> {
        let page = self.fetcher.fetch_page().await?;
        let countdowns = compute_countdowns(Utc::now(), page.server_time);
        self.parser.parse_with_countdowns(&page.html, &countdowns)
    }
}

#[async_trait]
impl SnapshotSource for StockScraper {
    async fn fetch_snapshot(&self) -> std::result::Result<StockSnapshot, FetchError> {
        self.fetch_stock_snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::{Category, StockItem};
    use crate::utils::log::NullSink;

    const PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<div class="container">
  <div class="grid grid-cols-1 md:grid-cols-3 gap-6">
    <div class="card">
      <h2 class="text-xl">GEAR STOCK</h2>
      <ul class="space-y-2">
        <li><span>Watering Can <span class="text-gray-400">x2</span></span></li>
        <li><span>Widget <span class="text-gray-400">x2</span></span></li>
        <li><span>Widget <span class="text-gray-400">x3</span></span></li>
      </ul>
    </div>
    <div class="card">
      <h2 class="text-xl">EGG STOCK</h2>
      <ul class="space-y-2">
        <li><span>Common Egg <span class="text-gray-400">x1</span></span></li>
        <li><span>Common Egg <span class="text-gray-400">x1</span></span></li>
        <li><span>Bug Egg</span></li>
      </ul>
    </div>
    <div class="card">
      <h2 class="text-xl">SEEDS STOCK</h2>
      <ul class="space-y-2">
        <li><span>Carrot <span class="text-gray-400">x14</span></span></li>
        <li><span>Strawberry <span class="text-gray-400">x5</span></span></li>
      </ul>
    </div>
  </div>
</div>
</body></html>"#;

    fn parser() -> StockParser {
        StockParser::from_config(&SelectorConfig::default(), Arc::new(NullSink)).unwrap()
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 58, 30).unwrap()
    }

    #[test]
    fn test_full_page() {
        let snapshot = parser().parse(PAGE, reference()).unwrap();

        assert_eq!(
            snapshot.gear_stock.items,
            vec![StockItem::new("Watering Can", 2), StockItem::new("Widget", 5)]
        );
        assert_eq!(
            snapshot.egg_stock.items,
            vec![StockItem::new("Common Egg", 1), StockItem::new("Common Egg", 1)]
        );
        assert_eq!(snapshot.seeds_stock.items.len(), 2);
        assert_eq!(snapshot.seeds_stock.total_quantity(), 19);
        assert_eq!(snapshot.gear_stock.updates_in, "01m 30s");
        assert_eq!(snapshot.egg_stock.updates_in, "01m 30s");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let parser = parser();
        assert_eq!(
            parser.parse(PAGE, reference()).unwrap(),
            parser.parse(PAGE, reference()).unwrap()
        );
    }

    #[test]
    fn test_generic_container_fallback() {
        let page = PAGE.replace("grid grid-cols-1 md:grid-cols-3 gap-6", "stock-wrapper");
        let snapshot = parser().parse(&page, reference()).unwrap();
        assert_eq!(snapshot.category(Category::Seeds).items.len(), 2);
        assert_eq!(snapshot.item_count(), 6);
    }

    #[test]
    fn test_serialized_shape() {
        let snapshot = parser().parse(PAGE, reference()).unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["gear_stock"]["items"][1]["name"], "Widget");
        assert_eq!(json["gear_stock"]["items"][1]["quantity"], 5);
        assert_eq!(json["seeds_stock"]["updates_in"], "01m 30s");
    }

    #[test]
    fn test_placeholder_page_is_empty_result() {
        let page = r#"<div class="grid grid-cols-3">
            <div><h2>GEAR STOCK</h2><ul class="space-y-2"><li><span>Loading...</span></li></ul></div>
            <div><h2>EGG STOCK</h2><ul class="space-y-2"></ul></div>
            <div><h2>SEEDS STOCK</h2><ul class="space-y-2"></ul></div></div>"#;
        assert!(matches!(
            parser().parse(page, reference()),
            Err(FetchError::EmptyResult(_))
        ));
    }
}
