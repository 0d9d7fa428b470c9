// src/services/locator.rs

//! Section locator.
//!
//! Finds the grid container grouping the stock categories, then splits it
//! into headed sections. Grid detection is an ordered list of
//! [`LocatorStrategy`] values tried in sequence; the first to return a
//! container wins.

use std::collections::HashMap;
use std::sync::Arc;

use scraper::{ElementRef, Html};

use crate::error::FetchError;
use crate::models::PageSelectors;
use crate::utils::log::{EventSink, PipelineEvent};
use crate::utils::normalize_whitespace;

/// Element names treated as block containers.
const CONTAINER_TAGS: [&str; 3] = ["div", "section", "article"];

/// One stock category's markup block.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    /// Normalized heading text
    pub heading: String,
    pub element: ElementRef<'a>,
}

/// A heuristic for finding the grid container.
pub trait LocatorStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn find_grid<'a>(&self, document: &'a Html, selectors: &PageSelectors)
        -> Option<ElementRef<'a>>;
}

/// First container whose class attribute matches the responsive grid pattern.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimaryGrid;

impl LocatorStrategy for PrimaryGrid {
    fn name(&self) -> &'static str {
        "primary-grid"
    }

    fn find_grid<'a>(
        &self,
        document: &'a Html,
        selectors: &PageSelectors,
    ) -> Option<ElementRef<'a>> {
        document
            .select(&selectors.container)
            .find(|el| class_matches(el, &selectors.grid_class))
    }
}

/// Grid-like container that holds a stock heading, or the grid-like
/// descendant of a container that does.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadedGrid;

impl LocatorStrategy for HeadedGrid {
    fn name(&self) -> &'static str {
        "headed-grid"
    }

    fn find_grid<'a>(
        &self,
        document: &'a Html,
        selectors: &PageSelectors,
    ) -> Option<ElementRef<'a>> {
        for el in document.select(&selectors.container) {
            if !contains_stock_heading(&el, selectors) {
                continue;
            }
            if class_matches(&el, &selectors.loose_grid_class) {
                return Some(el);
            }
            let nested = el.select(&selectors.container).find(|inner| {
                class_matches(inner, &selectors.loose_grid_class)
                    && contains_stock_heading(inner, selectors)
            });
            if nested.is_some() {
                return nested;
            }
        }
        None
    }
}

/// Container that is the common parent of the most stock-headed blocks.
///
/// Needs no class names at all; each stock heading is walked up to the
/// widest container holding only that heading, and the parents of those
/// blocks vote.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadingParent;

impl LocatorStrategy for HeadingParent {
    fn name(&self) -> &'static str {
        "heading-parent"
    }

    fn find_grid<'a>(
        &self,
        document: &'a Html,
        selectors: &PageSelectors,
    ) -> Option<ElementRef<'a>> {
        let mut votes: Vec<(ElementRef<'a>, usize)> = Vec::new();
        let mut index: HashMap<_, usize> = HashMap::new();

        let headings = document
            .select(&selectors.heading)
            .filter(|h| is_stock_heading(h, selectors));

        for heading in headings {
            let Some(block) = widest_single_heading_block(heading, selectors) else {
                continue;
            };
            let Some(parent) = block.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            match index.get(&parent.id()) {
                Some(&i) => votes[i].1 += 1,
                None => {
                    index.insert(parent.id(), votes.len());
                    votes.push((parent, 1));
                }
            }
        }

        let best = votes.iter().map(|(_, n)| *n).max()?;
        votes
            .into_iter()
            .find(|(_, n)| *n == best)
            .map(|(el, _)| el)
    }
}

/// The built-in strategies, in the order they are tried.
pub fn default_strategies() -> Vec<Box<dyn LocatorStrategy>> {
    vec![
        Box::new(PrimaryGrid),
        Box::new(HeadedGrid),
        Box::new(HeadingParent),
    ]
}

/// Locates stock sections in a parsed document.
pub struct SectionLocator {
    selectors: Arc<PageSelectors>,
    strategies: Vec<Box<dyn LocatorStrategy>>,
    events: Arc<dyn EventSink>,
}

impl SectionLocator {
    pub fn new(selectors: Arc<PageSelectors>, events: Arc<dyn EventSink>) -> Self {
        Self {
            selectors,
            strategies: default_strategies(),
            events,
        }
    }

    /// Replace the strategy list.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn LocatorStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Append a strategy tried after the existing ones.
    pub fn push_strategy(&mut self, strategy: Box<dyn LocatorStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Find the headed sections of the stock grid, in document order.
    ///
    /// A strategy whose grid holds no headed section hands over to the next
    /// one.
    pub fn locate_sections<'a>(
        &self,
        document: &'a Html,
    ) -> std::result::Result<Vec<Section<'a>>, FetchError> {
        let mut empty_grid = None;

        for strategy in &self.strategies {
            let Some(grid) = strategy.find_grid(document, &self.selectors) else {
                continue;
            };

            let mut sections = self.headed(direct_child_containers(grid));
            if sections.is_empty() {
                sections = self.headed(self.descendant_blocks(grid));
            }

            self.events.record(PipelineEvent::LocatorMatched {
                strategy: strategy.name(),
                sections: sections.len(),
            });

            if !sections.is_empty() {
                return Ok(sections);
            }
            empty_grid.get_or_insert(strategy.name());
        }

        Err(match empty_grid {
            Some(strategy) => FetchError::structure(format!(
                "no headed sections inside grid found by '{strategy}'"
            )),
            None => FetchError::structure(format!(
                "stock grid not found (tried {})",
                self.strategy_names().join(", ")
            )),
        })
    }

    /// Keep candidates carrying a non-empty heading.
    fn headed<'a>(&self, candidates: Vec<ElementRef<'a>>) -> Vec<Section<'a>> {
        candidates
            .into_iter()
            .filter_map(|element| {
                let heading = element
                    .select(&self.selectors.heading)
                    .map(|h| normalize_whitespace(&h.text().collect::<String>()))
                    .find(|text| !text.is_empty())?;
                Some(Section { heading, element })
            })
            .collect()
    }

    /// Looser scan: the widest descendant containers holding exactly one heading.
    fn descendant_blocks<'a>(&self, grid: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let heading_count = |el: &ElementRef<'_>| el.select(&self.selectors.heading).count();

        grid.select(&self.selectors.container)
            .filter(|el| heading_count(el) == 1)
            .filter(|el| {
                el.parent()
                    .and_then(ElementRef::wrap)
                    .is_some_and(|p| p.id() == grid.id() || heading_count(&p) > 1)
            })
            .collect()
    }
}

fn is_container(el: &ElementRef<'_>) -> bool {
    CONTAINER_TAGS.contains(&el.value().name())
}

fn class_matches(el: &ElementRef<'_>, pattern: &regex::Regex) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|class| pattern.is_match(class))
}

fn is_stock_heading(el: &ElementRef<'_>, selectors: &PageSelectors) -> bool {
    selectors
        .stock_heading
        .is_match(&normalize_whitespace(&el.text().collect::<String>()))
}

fn contains_stock_heading(el: &ElementRef<'_>, selectors: &PageSelectors) -> bool {
    el.select(&selectors.heading)
        .any(|h| is_stock_heading(&h, selectors))
}

fn direct_child_containers(grid: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    grid.children()
        .filter_map(ElementRef::wrap)
        .filter(is_container)
        .collect()
}

/// Walk up from a heading to the widest container that holds no other
/// stock heading.
fn widest_single_heading_block<'a>(
    heading: ElementRef<'a>,
    selectors: &PageSelectors,
) -> Option<ElementRef<'a>> {
    let mut block = None;
    for ancestor in heading.ancestors().filter_map(ElementRef::wrap) {
        if !is_container(&ancestor) {
            continue;
        }
        let stock_headings = ancestor
            .select(&selectors.heading)
            .filter(|h| is_stock_heading(h, selectors))
            .count();
        if stock_headings > 1 {
            break;
        }
        block = Some(ancestor);
    }
    block
}
