// src/models/stock.rs

//! Stock snapshot data structures.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Countdown value used when a category was never found on the page.
pub const UNKNOWN_COUNTDOWN: &str = "Unknown";

/// One of the three shop categories listed on the stock page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Gear,
    Egg,
    Seeds,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Gear, Category::Egg, Category::Seeds];

    /// Match a section heading by case-insensitive substring.
    ///
    /// Checked in the order GEAR, EGG, SEEDS.
    pub fn from_heading(heading: &str) -> Option<Self> {
        let upper = heading.to_uppercase();
        if upper.contains("GEAR") {
            Some(Category::Gear)
        } else if upper.contains("EGG") {
            Some(Category::Egg)
        } else if upper.contains("SEEDS") {
            Some(Category::Seeds)
        } else {
            None
        }
    }

    /// Restock period in seconds.
    pub fn restock_period_secs(self) -> i64 {
        match self {
            Category::Gear | Category::Seeds => 5 * 60,
            Category::Egg => 30 * 60,
        }
    }

    /// Whether entries with the same name are merged into one item.
    ///
    /// Eggs are listed once per slot, so repeated names stay separate.
    pub fn merges_duplicates(self) -> bool {
        !matches!(self, Category::Egg)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Gear => "gear",
            Category::Egg => "egg",
            Category::Seeds => "seeds",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gear" => Ok(Category::Gear),
            "egg" | "eggs" => Ok(Category::Egg),
            "seed" | "seeds" => Ok(Category::Seeds),
            other => Err(format!("unknown category '{other}' (expected gear, egg or seeds)")),
        }
    }
}

/// A named item and how many are in stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockItem {
    /// Trimmed, non-empty item name
    pub name: String,

    /// Units in stock
    pub quantity: u32,
}

impl StockItem {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Items of one category and the time until its next restock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorySnapshot {
    /// Items in order of first appearance on the page
    pub items: Vec<StockItem>,

    /// Countdown string such as `"03m 12s"`, or `"Unknown"`
    pub updates_in: String,
}

impl CategorySnapshot {
    pub fn new(items: Vec<StockItem>, updates_in: impl Into<String>) -> Self {
        Self {
            items,
            updates_in: updates_in.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all items.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

impl Default for CategorySnapshot {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            updates_in: UNKNOWN_COUNTDOWN.to_string(),
        }
    }
}

/// Complete result of one successful pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockSnapshot {
    pub gear_stock: CategorySnapshot,
    pub egg_stock: CategorySnapshot,
    pub seeds_stock: CategorySnapshot,
}

impl StockSnapshot {
    pub fn category(&self, category: Category) -> &CategorySnapshot {
        match category {
            Category::Gear => &self.gear_stock,
            Category::Egg => &self.egg_stock,
            Category::Seeds => &self.seeds_stock,
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut CategorySnapshot {
        match category {
            Category::Gear => &mut self.gear_stock,
            Category::Egg => &mut self.egg_stock,
            Category::Seeds => &mut self.seeds_stock,
        }
    }

    /// True when no category holds any item.
    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.category(*c).is_empty())
    }

    pub fn item_count(&self) -> usize {
        Category::ALL.iter().map(|c| self.category(*c).items.len()).sum()
    }
}
