// src/services/extractor.rs

//! Item extraction.
//!
//! Every list entry becomes a `Result<StockItem, SkipReason>`; skipped
//! entries are reported and dropped without affecting their siblings.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use scraper::ElementRef;

use crate::models::{Category, PageSelectors, StockItem};
use crate::services::locator::Section;
use crate::utils::log::{EventSink, PipelineEvent};
use crate::utils::normalize_whitespace;

/// Why an entry produced no item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No name label element
    MissingName,
    /// Name label has no leading text
    EmptyName,
    /// No element with the quantity class
    MissingQuantity { name: String },
    /// Quantity element holds no digits
    NoDigits { name: String, text: String },
    /// Digit run does not fit a `u32`
    QuantityOverflow { name: String, digits: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingName => write!(f, "no name label"),
            SkipReason::EmptyName => write!(f, "empty name"),
            SkipReason::MissingQuantity { name } => write!(f, "'{name}' has no quantity element"),
            SkipReason::NoDigits { name, text } => {
                write!(f, "'{name}' quantity '{text}' has no digits")
            }
            SkipReason::QuantityOverflow { name, digits } => {
                write!(f, "'{name}' quantity {digits} is out of range")
            }
        }
    }
}

/// Parses list entries of a section into stock items.
pub struct ItemExtractor {
    selectors: Arc<PageSelectors>,
    events: Arc<dyn EventSink>,
}

impl ItemExtractor {
    pub fn new(selectors: Arc<PageSelectors>, events: Arc<dyn EventSink>) -> Self {
        Self { selectors, events }
    }

    /// Extract the items of one section, applying the category's
    /// aggregation policy.
    pub fn extract_items(&self, section: &Section<'_>, category: Category) -> Vec<StockItem> {
        let parsed = self
            .parse_entries(section.element)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(item) => Some(item),
                Err(reason) => {
                    self.events.record(PipelineEvent::EntrySkipped {
                        category,
                        reason: reason.to_string(),
                    });
                    None
                }
            });
        aggregate(category, parsed)
    }

    /// Parse every entry of the section's item list.
    pub fn parse_entries(&self, section: ElementRef<'_>) -> Vec<Result<StockItem, SkipReason>> {
        let Some(list) = self.find_list(section) else {
            return Vec::new();
        };
        list.select(&self.selectors.entry)
            .map(|entry| self.parse_entry(entry))
            .collect()
    }

    /// The spacing-classed list, or the first list of any kind.
    fn find_list<'a>(&self, section: ElementRef<'a>) -> Option<ElementRef<'a>> {
        section
            .select(&self.selectors.list)
            .find(|list| {
                list.value()
                    .attr("class")
                    .is_some_and(|c| self.selectors.list_class.is_match(c))
            })
            .or_else(|| section.select(&self.selectors.list).next())
    }

    fn parse_entry(&self, entry: ElementRef<'_>) -> Result<StockItem, SkipReason> {
        let label = entry
            .select(&self.selectors.name)
            .next()
            .ok_or(SkipReason::MissingName)?;

        let name = leading_text(label);
        if name.is_empty() {
            return Err(SkipReason::EmptyName);
        }

        let quantity_el = label
            .select(&self.selectors.span)
            .chain(entry.select(&self.selectors.span))
            .find(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|c| self.selectors.quantity_class.is_match(c))
            })
            .ok_or_else(|| SkipReason::MissingQuantity { name: name.clone() })?;

        let text = normalize_whitespace(&quantity_el.text().collect::<String>());
        let digits = self
            .selectors
            .digits
            .find(&text)
            .ok_or_else(|| SkipReason::NoDigits {
                name: name.clone(),
                text: text.clone(),
            })?
            .as_str();
        let quantity = digits
            .parse::<u32>()
            .map_err(|_| SkipReason::QuantityOverflow {
                name: name.clone(),
                digits: digits.to_string(),
            })?;

        Ok(StockItem::new(name, quantity))
    }
}

/// Leading text of the element: its first non-blank text node, provided
/// no child element comes before it.
fn leading_text(element: ElementRef<'_>) -> String {
    for node in element.children() {
        if node.value().is_element() {
            break;
        }
        if let Some(text) = node.value().as_text() {
            let text = normalize_whitespace(text);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// Apply the category's duplicate policy.
///
/// Merging categories sum quantities per name, keeping first-occurrence
/// order. Eggs keep every entry.
pub fn aggregate(category: Category, items: impl IntoIterator<Item = StockItem>) -> Vec<StockItem> {
    if !category.merges_duplicates() {
        return items.into_iter().collect();
    }

    let mut merged: Vec<StockItem> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        match index.get(&item.name) {
            Some(&i) => {
                merged[i].quantity = merged[i].quantity.saturating_add(item.quantity);
            }
            None => {
                index.insert(item.name.clone(), merged.len());
                merged.push(item);
            }
        }
    }
    merged
}
