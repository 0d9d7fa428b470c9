// src/services/assembler.rs

//! Snapshot assembly.

use std::sync::Arc;

use crate::error::FetchError;
use crate::models::{Category, CategorySnapshot, PageSelectors, StockSnapshot};
use crate::services::countdown::{Countdowns, read_embedded_countdown};
use crate::services::extractor::ItemExtractor;
use crate::services::locator::Section;
use crate::utils::log::{EventSink, PipelineEvent};

/// Merges located sections, extracted items and countdowns into a snapshot.
pub struct SnapshotAssembler {
    selectors: Arc<PageSelectors>,
    extractor: ItemExtractor,
    events: Arc<dyn EventSink>,
}

impl SnapshotAssembler {
    pub fn new(selectors: Arc<PageSelectors>, events: Arc<dyn EventSink>) -> Self {
        Self {
            extractor: ItemExtractor::new(Arc::clone(&selectors), Arc::clone(&events)),
            selectors,
            events,
        }
    }

    /// Build the snapshot.
    ///
    /// Sections with unrecognized headings are ignored. When a category
    /// appears twice the later section replaces the earlier one. Fails with
    /// [`FetchError::EmptyResult`] when no category has any item.
    pub fn assemble(
        &self,
        sections: &[Section<'_>],
        countdowns: &Countdowns,
    ) -> Result<StockSnapshot, FetchError> {
        let mut snapshot = StockSnapshot::default();

        for section in sections {
            let Some(category) = Category::from_heading(&section.heading) else {
                self.events.record(PipelineEvent::SectionIgnored {
                    heading: section.heading.clone(),
                });
                continue;
            };

            let items = self.extractor.extract_items(section, category);
            let updates_in = self
                .embedded_countdown(section)
                .unwrap_or_else(|| countdowns.get(category).to_string());

            self.events.record(PipelineEvent::CategoryParsed {
                category,
                items: items.len(),
                updates_in: updates_in.clone(),
            });
            *snapshot.category_mut(category) = CategorySnapshot::new(items, updates_in);
        }

        if snapshot.is_empty() {
            return Err(FetchError::empty(format!(
                "{} sections located but no items could be parsed",
                sections.len()
            )));
        }
        Ok(snapshot)
    }

    /// Server-rendered countdown inside the section, if any.
    fn embedded_countdown(&self, section: &Section<'_>) -> Option<String> {
        let text: String = section.element.text().collect::<Vec<_>>().join(" ");
        read_embedded_countdown(&text, &self.selectors.countdown)
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;
    use crate::models::{SelectorConfig, StockItem};
    use crate::services::locator::SectionLocator;
    use crate::utils::log::{NullSink, RecordingSink};

    fn countdowns() -> Countdowns {
        Countdowns {
            gear: "01m 30s".to_string(),
            egg: "16m 00s".to_string(),
            seeds: "01m 30s".to_string(),
        }
    }

    fn run(html: &str, events: Arc<dyn EventSink>) -> Result<StockSnapshot, FetchError> {
        let selectors = Arc::new(SelectorConfig::default().compile().unwrap());
        let document = Html::parse_document(html);
        let sections = SectionLocator::new(Arc::clone(&selectors), Arc::clone(&events))
            .locate_sections(&document)?;
        SnapshotAssembler::new(selectors, events).assemble(&sections, &countdowns())
    }

    const ITEM: &str = r#"<li><span>Carrot <span class="text-gray-400">x7</span></span></li>"#;

    #[test]
    fn test_missing_category_defaults() {
        let html = format!(
            r#"<div class="grid grid-cols-3"><div><h2>SEEDS STOCK</h2><ul>{ITEM}</ul></div></div>"#
        );
        let snapshot = run(&html, Arc::new(NullSink)).unwrap();
        assert_eq!(snapshot.seeds_stock.items, vec![StockItem::new("Carrot", 7)]);
        assert_eq!(snapshot.seeds_stock.updates_in, "01m 30s");
        assert_eq!(snapshot.gear_stock, CategorySnapshot::default());
        assert_eq!(snapshot.egg_stock.updates_in, "Unknown");
    }

    #[test]
    fn test_embedded_countdown_preferred() {
        let html = format!(
            r#"<div class="grid grid-cols-3"><div><h2>GEAR STOCK</h2>
                <p>UPDATES IN: <span>02m 41s</span></p><ul>{ITEM}</ul></div></div>"#
        );
        let snapshot = run(&html, Arc::new(NullSink)).unwrap();
        assert_eq!(snapshot.gear_stock.updates_in, "02m 41s");
    }

    #[test]
    fn test_unknown_heading_ignored() {
        let html = format!(
            r#"<div class="grid grid-cols-3">
                <div><h2>WEATHER</h2><ul>{ITEM}</ul></div>
                <div><h2>EGG STOCK</h2><ul>{ITEM}</ul></div></div>"#
        );
        let sink = RecordingSink::new();
        let snapshot = run(&html, sink.clone()).unwrap();
        assert_eq!(snapshot.egg_stock.items.len(), 1);
        assert_eq!(snapshot.item_count(), 1);
        assert!(sink.events().contains(&PipelineEvent::SectionIgnored {
            heading: "WEATHER".to_string()
        }));
    }

    #[test]
    fn test_all_empty_is_empty_result() {
        let html = r#"<div class="grid grid-cols-3">
            <div><h2>GEAR STOCK</h2><ul><li><span>Broken</span></li></ul></div>
            <div><h2>EGG STOCK</h2><ul></ul></div>
            <div><h2>SEEDS STOCK</h2></div></div>"#;
        let err = run(html, Arc::new(NullSink)).unwrap_err();
        assert!(matches!(err, FetchError::EmptyResult(ref d) if d.starts_with("3 sections")));
    }
}
