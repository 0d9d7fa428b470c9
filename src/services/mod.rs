//! Service layer for the stock scraper.
//!
//! This module contains the pipeline stages:
//! - Page fetching (`PageFetcher`)
//! - Restock countdowns (`compute_countdowns`)
//! - Section location (`SectionLocator`)
//! - Item extraction (`ItemExtractor`)
//! - Snapshot assembly (`SnapshotAssembler`)

pub mod assembler;
pub mod countdown;
pub mod extractor;
pub mod fetcher;
pub mod locator;

pub use assembler::SnapshotAssembler;
pub use countdown::{Countdowns, compute_countdowns};
pub use extractor::{ItemExtractor, SkipReason};
pub use fetcher::{FetchedPage, PageFetcher};
pub use locator::{LocatorStrategy, Section, SectionLocator};
