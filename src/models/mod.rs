//! Data models for competitor prices and the unified per-SKU record set

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::traits::Strategy;

/// Exported in place of a competitor price that was attempted but could not be determined
pub const UNRESOLVED: &str = "None";

/// An exact money amount, stored as integer cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price {
    cents: u64,
}

impl Price {
    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub const fn cents(self) -> u64 {
        self.cents
    }

    /// Parse a plain decimal amount such as `1,234.5`. No range check is applied.
    pub fn parse_amount(raw: &str) -> Option<Self> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return None;
        }

        let value: f64 = cleaned.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cents = (value * 100.0).round() as u64;
        Some(Self { cents })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

/// Resolution of one competitor's price for one SKU.
///
/// `NotFound` and `NoLink` export as the same [`UNRESOLVED`] sentinel; they
/// stay distinct here for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStatus {
    Found,
    NotFound,
    NoLink,
}

impl PriceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not_found",
            Self::NoLink => "no_link",
        }
    }
}

/// A competitor's price for a single product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub source_link: String,
    pub raw_value: Option<Price>,
    pub status: PriceStatus,
}

impl PriceEntry {
    pub fn found(source_link: impl Into<String>, price: Price) -> Self {
        Self {
            source_link: source_link.into(),
            raw_value: Some(price),
            status: PriceStatus::Found,
        }
    }

    pub fn not_found(source_link: impl Into<String>) -> Self {
        Self {
            source_link: source_link.into(),
            raw_value: None,
            status: PriceStatus::NotFound,
        }
    }

    pub fn no_link(source_link: impl Into<String>) -> Self {
        Self {
            source_link: source_link.into(),
            raw_value: None,
            status: PriceStatus::NoLink,
        }
    }

    /// Normalized two-decimal price, or the unresolved sentinel
    pub fn display_value(&self) -> String {
        self.raw_value
            .map_or_else(|| UNRESOLVED.to_string(), |price| price.to_string())
    }
}

/// One product in the unified record set, keyed by SKU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub sku: String,
    pub my_price: Option<Price>,
    pub competitor_prices: BTreeMap<String, PriceEntry>,
}

impl ProductRecord {
    pub fn new(sku: impl Into<String>, my_price: Option<Price>) -> Self {
        Self {
            sku: sku.into(),
            my_price,
            competitor_prices: BTreeMap::new(),
        }
    }

    /// Compare our own price against one competitor's resolved price
    pub fn comparison(&self, competitor: &str) -> Comparison {
        let theirs = self
            .competitor_prices
            .get(competitor)
            .and_then(|entry| entry.raw_value);
        Comparison::between(self.my_price, theirs)
    }
}

/// Derived marker for our price relative to a competitor's
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    /// Our price is higher than the competitor's
    High,
    /// Our price is lower than the competitor's
    Low,
    /// Either side is missing
    Unavailable,
}

impl Comparison {
    pub fn between(ours: Option<Price>, theirs: Option<Price>) -> Self {
        match (ours, theirs) {
            (Some(ours), Some(theirs)) if ours == theirs => Self::Equal,
            (Some(ours), Some(theirs)) if ours > theirs => Self::High,
            (Some(_), Some(_)) => Self::Low,
            _ => Self::Unavailable,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Low => "low",
            Self::Equal | Self::Unavailable => "",
        }
    }
}

/// Result of one extraction attempt; consumed immediately by the reconciler
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub competitor: String,
    pub sku: String,
    pub source_link: String,
    pub price: Option<Price>,
    pub strategy_used: Option<Strategy>,
    pub status: PriceStatus,
}

impl ExtractionOutcome {
    pub fn into_entry(self) -> PriceEntry {
        match (self.status, self.price) {
            (PriceStatus::Found, Some(price)) => PriceEntry::found(self.source_link, price),
            (PriceStatus::NoLink, _) => PriceEntry::no_link(self.source_link),
            _ => PriceEntry::not_found(self.source_link),
        }
    }
}

/// One row of the input link list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    pub sku: String,
    pub my_price: Option<Price>,
    /// Competitor name to product link
    pub links: BTreeMap<String, String>,
}

/// Flattened (SKU × competitor) row handed to the output sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifiedRow {
    #[serde(rename = "SKU")]
    pub sku: String,
    pub my_price: String,
    pub competitor: String,
    pub competitor_price: String,
    pub competitor_link: String,
    pub comparison: String,
    #[serde(skip)]
    pub status: Option<PriceStatus>,
}
