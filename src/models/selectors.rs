// src/models/selectors.rs

//! Class patterns and CSS selectors used to read the stock page.

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Raw selector settings as they appear in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Regex matched against the full class attribute of the grid container
    #[serde(default = "defaults::grid_class_pattern")]
    pub grid_class_pattern: String,

    /// Looser grid regex used by the fallback locator strategies
    #[serde(default = "defaults::loose_grid_class_pattern")]
    pub loose_grid_class_pattern: String,

    /// CSS selector for section headings
    #[serde(default = "defaults::heading_selector")]
    pub heading_selector: String,

    /// Regex a heading must match to count as a stock heading
    #[serde(default = "defaults::stock_heading_pattern")]
    pub stock_heading_pattern: String,

    /// Regex matched against the class attribute of the item list
    #[serde(default = "defaults::list_class_pattern")]
    pub list_class_pattern: String,

    /// CSS selector for one entry inside the item list
    #[serde(default = "defaults::entry_selector")]
    pub entry_selector: String,

    /// CSS selector for the label holding the item name
    #[serde(default = "defaults::name_selector")]
    pub name_selector: String,

    /// Regex matched against the class attribute of the quantity element
    #[serde(default = "defaults::quantity_class_pattern")]
    pub quantity_class_pattern: String,

    /// Regex with one capture group reading a countdown rendered on the page
    #[serde(default = "defaults::countdown_pattern")]
    pub countdown_pattern: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            grid_class_pattern: defaults::grid_class_pattern(),
            loose_grid_class_pattern: defaults::loose_grid_class_pattern(),
            heading_selector: defaults::heading_selector(),
            stock_heading_pattern: defaults::stock_heading_pattern(),
            list_class_pattern: defaults::list_class_pattern(),
            entry_selector: defaults::entry_selector(),
            name_selector: defaults::name_selector(),
            quantity_class_pattern: defaults::quantity_class_pattern(),
            countdown_pattern: defaults::countdown_pattern(),
        }
    }
}

impl SelectorConfig {
    /// Compile every pattern and selector.
    pub fn compile(&self) -> Result<PageSelectors> {
        Ok(PageSelectors {
            grid_class: Regex::new(&self.grid_class_pattern)?,
            loose_grid_class: Regex::new(&self.loose_grid_class_pattern)?,
            heading: parse_selector(&self.heading_selector)?,
            stock_heading: Regex::new(&self.stock_heading_pattern)?,
            list_class: Regex::new(&self.list_class_pattern)?,
            entry: parse_selector(&self.entry_selector)?,
            name: parse_selector(&self.name_selector)?,
            quantity_class: Regex::new(&self.quantity_class_pattern)?,
            countdown: Regex::new(&self.countdown_pattern)?,
            digits: Regex::new(r"\d+")?,
            container: parse_selector("div, section, article")?,
            list: parse_selector("ul, ol")?,
            span: parse_selector("span")?,
        })
    }
}

/// Compiled form of [`SelectorConfig`].
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub grid_class: Regex,
    pub loose_grid_class: Regex,
    pub heading: Selector,
    pub stock_heading: Regex,
    pub list_class: Regex,
    pub entry: Selector,
    pub name: Selector,
    pub quantity_class: Regex,
    pub countdown: Regex,
    pub digits: Regex,
    pub container: Selector,
    pub list: Selector,
    pub span: Selector,
}

/// Parse a CSS selector, mapping the error into [`AppError`].
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

mod defaults {
    pub fn grid_class_pattern() -> String {
        r"grid.*grid-cols".into()
    }
    pub fn loose_grid_class_pattern() -> String {
        r"(?i)\bgrid\b|grid-cols|\bcolumns\b|\bflex-wrap\b".into()
    }
    pub fn heading_selector() -> String {
        "h1, h2, h3".into()
    }
    pub fn stock_heading_pattern() -> String {
        r"(?i)GEAR STOCK|EGG STOCK|SEEDS STOCK".into()
    }
    pub fn list_class_pattern() -> String {
        r"space-y".into()
    }
    pub fn entry_selector() -> String {
        "li".into()
    }
    pub fn name_selector() -> String {
        "span".into()
    }
    pub fn quantity_class_pattern() -> String {
        r"text-gray|text-muted".into()
    }
    pub fn countdown_pattern() -> String {
        r"(?i)updates?\s+in\s*:?\s*((?:\d{1,2}h\s*)?\d{1,2}m\s*\d{1,2}s)".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_compile() {
        assert!(SelectorConfig::default().compile().is_ok());
    }

    #[test]
    fn test_invalid_selector_reported() {
        let config = SelectorConfig {
            entry_selector: "[[invalid".to_string(),
            ..SelectorConfig::default()
        };
        let err = config.compile().unwrap_err();
        assert!(matches!(err, AppError::Selector { .. }));
    }

    #[test]
    fn test_invalid_regex_reported() {
        let config = SelectorConfig {
            grid_class_pattern: "grid(".to_string(),
            ..SelectorConfig::default()
        };
        assert!(matches!(config.compile().unwrap_err(), AppError::Regex(_)));
    }

    #[test]
    fn test_countdown_pattern_captures() {
        let selectors = SelectorConfig::default().compile().unwrap();
        let caps = selectors
            .countdown
            .captures("UPDATES IN: 03m 12s")
            .unwrap();
        assert_eq!(&caps[1], "03m 12s");
        let caps = selectors.countdown.captures("Updates in 1h 02m 05s").unwrap();
        assert_eq!(&caps[1], "1h 02m 05s");
    }
}
