//! Free-text price parsing with an ordered set of currency patterns

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Price;

/// Lowest accepted price, in cents
const MIN_CENTS: u64 = 100;
/// Highest accepted price, in cents
const MAX_CENTS: u64 = 10_000_000;

/// Patterns in priority order. Each has exactly one capture group holding the amount.
static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "Price: Rs. 1,234.50"
        r"(?i)\bprice\s*:\s*(?:rs\.?|pkr)\s*(\d[\d,]*(?:\.\d{1,2})?)",
        // "Rs. 1,234.50", "PKR 99"
        r"(?i)\b(?:rs\.?|pkr)\s*(\d[\d,]*(?:\.\d{1,2})?)",
        // "1,234.50 Rs", "99 PKR"
        r"(?i)(\d[\d,]*(?:\.\d{1,2})?)\s*(?:rs|pkr)\b",
        // bare number, last resort
        r"(\d[\d,]*(?:\.\d{1,2})?)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("price pattern is valid"))
    .collect()
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Turns free text into a validated, normalized price
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceTextParser;

impl PriceTextParser {
    pub fn new() -> Self {
        Self
    }

    /// Find the first valid price in `text`.
    ///
    /// Patterns are tried in priority order. Within a pattern, matches are taken
    /// in document order and the first in-range amount wins; if every match of a
    /// pattern is out of range the next pattern is tried.
    pub fn parse(&self, text: &str) -> Option<Price> {
        let normalized = WHITESPACE.replace_all(text.trim(), " ");

        PATTERNS.iter().find_map(|pattern| {
            pattern
                .captures_iter(&normalized)
                .filter_map(|caps| caps.get(1))
                .find_map(|amount| self.validate(amount.as_str()))
        })
    }

    /// Accept a raw amount (attribute value, structured-data field) if it lies in [1, 100000]
    pub fn validate(&self, raw: &str) -> Option<Price> {
        Price::parse_amount(raw).filter(|price| (MIN_CENTS..=MAX_CENTS).contains(&price.cents()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<String> {
        PriceTextParser::new().parse(text).map(|p| p.to_string())
    }

    #[test]
    fn test_currency_prefixed_with_separators() {
        assert_eq!(parse("Rs. 1,234.50").as_deref(), Some("1234.50"));
    }

    #[test]
    fn test_labelled_price() {
        assert_eq!(parse("Price: PKR 99").as_deref(), Some("99.00"));
        assert_eq!(parse("Price: Rs. 120.00").as_deref(), Some("120.00"));
    }

    #[test]
    fn test_no_price_in_text() {
        assert_eq!(parse("out of stock"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_suffixed_currency() {
        assert_eq!(parse("only 450 Rs today").as_deref(), Some("450.00"));
        assert_eq!(parse("2,500 PKR").as_deref(), Some("2500.00"));
    }

    #[test]
    fn test_single_fraction_digit_is_padded() {
        assert_eq!(parse("Rs 1234.5").as_deref(), Some("1234.50"));
    }

    #[test]
    fn test_label_beats_earlier_bare_currency() {
        // The labelled amount outranks an earlier "Rs" amount in document order
        assert_eq!(
            parse("Was Rs. 500 now Price: Rs. 450").as_deref(),
            Some("450.00")
        );
    }

    #[test]
    fn test_currency_marker_beats_bare_number() {
        assert_eq!(parse("Pack of 6 for Rs. 300").as_deref(), Some("300.00"));
    }

    #[test]
    fn test_first_match_in_document_order() {
        assert_eq!(parse("Rs. 100 or Rs. 90").as_deref(), Some("100.00"));
    }

    #[test]
    fn test_bare_number_is_last_resort() {
        assert_eq!(parse("Total 250").as_deref(), Some("250.00"));
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        assert_eq!(parse("Price:\n\t  Rs.\n  1,000").as_deref(), Some("1000.00"));
    }

    #[test]
    fn test_out_of_range_continues_search() {
        // 0.50 is rejected, the next match of the same pattern is accepted
        assert_eq!(parse("Rs. 0.50 then Rs. 75").as_deref(), Some("75.00"));
        // every currency match is out of range, the bare number is used
        assert_eq!(parse("Rs. 250000 qty 3").as_deref(), Some("3.00"));
    }

    #[test]
    fn test_range_boundaries() {
        assert_eq!(parse("Rs. 1").as_deref(), Some("1.00"));
        assert_eq!(parse("Rs. 100,000").as_deref(), Some("100000.00"));
        assert_eq!(parse("Rs. 100000.01"), None);
        assert_eq!(parse("Rs. 0.99"), None);
        assert_eq!(parse("PKR 150000"), None);
    }

    #[test]
    fn test_values_in_range_round_trip() {
        let parser = PriceTextParser::new();
        for cents in [100_u64, 101, 4_550, 99_999, 123_456, 9_999_999, 10_000_000] {
            let price = Price::from_cents(cents);
            for text in [format!("Rs. {price}"), format!("{price} PKR"), format!("Price: Rs {price}")] {
                assert_eq!(parser.parse(&text), Some(price), "input: {text}");
            }
        }
    }

    #[test]
    fn test_validate_raw_amounts() {
        let parser = PriceTextParser::new();
        assert_eq!(parser.validate("1299"), Some(Price::from_cents(129_900)));
        assert_eq!(parser.validate("1,299.5"), Some(Price::from_cents(129_950)));
        assert_eq!(parser.validate("0"), None);
        assert_eq!(parser.validate("n/a"), None);
    }
}
