//! Utility functions and helpers.

pub mod http;
pub mod log;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Gear \n  Stock "), "Gear Stock");
        assert_eq!(normalize_whitespace("\t"), "");
    }
}
