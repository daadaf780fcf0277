//! Metro Online (metro-online.pk)
//!
//! Product pages are rendered client-side. The price is also embedded in the
//! page's script payload as `sell_price` / `price`, which is read first.

use std::time::Duration;

use crate::traits::{AdapterConfig, RenderSpec, SiteAdapter, Strategy};

const DETAILS_PRICE: &str = "p.CategoryGrid_product_details_price__dNQQQ";
const LISTING_PRICE: &str = "p.CategoryGrid_product_price__Svf8T";

/// Adapter for metro-online.pk
pub struct MetroAdapter {
    config: AdapterConfig,
}

impl MetroAdapter {
    /// Create a Metro adapter waiting at most `wait_timeout` for the price element
    pub fn new(wait_timeout: Duration) -> Self {
        let price_selectors = [
            DETAILS_PRICE,
            ".product-price",
            ".price-display",
            ".price-value",
            ".product-price-value",
            ".price-amount",
            ".product-amount",
            ".selling-price",
            ".offer-price",
            ".discount-price",
            ".final-price",
            ".price-box",
            ".price-container",
            ".product-price-box",
            ".price-wrapper",
            ".price-section",
            ".product-details-price",
            ".current-price",
            ".regular-price",
            ".price-text",
            ".price",
            ".amount",
            "[class*=\"price\"]",
            "[class*=\"Price\"]",
            "[class*=\"amount\"]",
            "[class*=\"Amount\"]",
            "[data-price]",
            "[data-amount]",
            ".product-details",
            ".product-info",
            ".product-summary",
        ];

        let content_scopes = [
            "main",
            ".main-content",
            ".content",
            ".product-content",
            ".product-details",
            ".product-info",
            ".product-summary",
        ];

        let config = AdapterConfig {
            name: "Metro".to_string(),
            domains: vec!["metro-online.pk".to_string()],
            strategies: vec![
                Strategy::StructuredData,
                Strategy::RenderedPrimary,
                Strategy::RenderedMinimum,
                Strategy::SelectorCascade,
                Strategy::ScopedText,
                Strategy::FullDocument,
            ],
            structured_keys: vec!["sell_price".to_string(), "price".to_string()],
            price_selectors: price_selectors.iter().map(|s| (*s).to_string()).collect(),
            price_attributes: vec!["data-price".to_string(), "data-amount".to_string()],
            text_bounds: Some(3..=100),
            content_scopes: content_scopes.iter().map(|s| (*s).to_string()).collect(),
            render: Some(RenderSpec {
                wait_selector: DETAILS_PRICE.to_string(),
                fallback_selectors: vec![LISTING_PRICE.to_string()],
                wait_timeout,
            }),
        };

        Self { config }
    }
}

impl SiteAdapter for MetroAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }
}
