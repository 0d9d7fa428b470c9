// src/services/countdown.rs

//! Restock countdowns.
//!
//! Two sources, in order of preference:
//! - a countdown rendered into the page by the server, read verbatim
//! - the fixed schedule: gear and seeds every 5 minutes, eggs every 30
//!   minutes, aligned to wall-clock boundaries
//!
//! Schedule arithmetic is done on Unix seconds, so hour and day rollovers
//! need no special casing. The next boundary is always strictly after the
//! reference time: at exactly `12:00:00` gear reports `"05m 00s"`.

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;

use crate::models::Category;
use crate::utils::normalize_whitespace;

/// Countdown strings for the three categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdowns {
    pub gear: String,
    pub egg: String,
    pub seeds: String,
}

impl Countdowns {
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Gear => &self.gear,
            Category::Egg => &self.egg,
            Category::Seeds => &self.seeds,
        }
    }
}

/// Compute schedule-based countdowns.
///
/// `server_time` (from the response `Date` header) is preferred over
/// `local_time` when present.
pub fn compute_countdowns(
    local_time: DateTime<Utc>,
    server_time: Option<DateTime<Utc>>,
) -> Countdowns {
    let reference = server_time.unwrap_or(local_time);
    let countdown = |category| format_countdown(seconds_until_restock(category, reference));

    Countdowns {
        gear: countdown(Category::Gear),
        egg: countdown(Category::Egg),
        seeds: countdown(Category::Seeds),
    }
}

/// Next restock instant strictly after `reference`.
pub fn next_restock(category: Category, reference: DateTime<Utc>) -> DateTime<Utc> {
    let period = category.restock_period_secs();
    let next = (reference.timestamp().div_euclid(period) + 1) * period;
    Utc.timestamp_opt(next, 0).single().unwrap_or(reference)
}

/// Whole seconds from `reference` to the next restock.
pub fn seconds_until_restock(category: Category, reference: DateTime<Utc>) -> i64 {
    let period = category.restock_period_secs();
    period - reference.timestamp().rem_euclid(period)
}

/// Format seconds as `"MMm SSs"`, or `"HHh MMm SSs"` from one hour up.
///
/// Zero or negative input yields `"00m 00s"`.
pub fn format_countdown(seconds: i64) -> String {
    if seconds <= 0 {
        return "00m 00s".to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours:02}h {minutes:02}m {secs:02}s")
    } else {
        format!("{minutes:02}m {secs:02}s")
    }
}

/// Read a server-rendered countdown out of section text.
pub fn read_embedded_countdown(text: &str, pattern: &Regex) -> Option<String> {
    let text = normalize_whitespace(text);
    pattern
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_gear_before_hour_rollover() {
        let countdowns = compute_countdowns(at(12, 58, 30), None);
        assert_eq!(countdowns.gear, "01m 30s");
        assert_eq!(countdowns.seeds, "01m 30s");
        assert_eq!(countdowns.egg, "01m 30s");
    }

    #[test]
    fn test_exact_boundary_is_full_period() {
        let countdowns = compute_countdowns(at(12, 0, 0), None);
        assert_eq!(countdowns.gear, "05m 00s");
        assert_eq!(countdowns.egg, "30m 00s");
    }

    #[test]
    fn test_egg_half_hour_boundary() {
        assert_eq!(compute_countdowns(at(12, 10, 0), None).egg, "20m 00s");
        assert_eq!(compute_countdowns(at(12, 45, 15), None).egg, "14m 45s");
    }

    #[test]
    fn test_day_rollover() {
        let reference = at(23, 58, 0);
        assert_eq!(
            next_restock(Category::Gear, reference),
            Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(
            next_restock(Category::Egg, reference),
            Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_server_time_preferred() {
        let countdowns = compute_countdowns(at(12, 0, 0), Some(at(12, 3, 0)));
        assert_eq!(countdowns.gear, "02m 00s");
        assert_eq!(countdowns.get(Category::Gear), "02m 00s");
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "00m 00s");
        assert_eq!(format_countdown(-12), "00m 00s");
        assert_eq!(format_countdown(59), "00m 59s");
        assert_eq!(format_countdown(3599), "59m 59s");
        assert_eq!(format_countdown(3600), "01h 00m 00s");
        assert_eq!(format_countdown(3725), "01h 02m 05s");
    }

    #[test]
    fn test_read_embedded_countdown() {
        let pattern = Regex::new(r"(?i)updates?\s+in\s*:?\s*((?:\d{1,2}h\s*)?\d{1,2}m\s*\d{1,2}s)")
            .unwrap();
        assert_eq!(
            read_embedded_countdown("GEAR STOCK\n UPDATES IN:\n 03m 12s", &pattern),
            Some("03m 12s".to_string())
        );
        assert_eq!(read_embedded_countdown("GEAR STOCK", &pattern), None);
    }
}
