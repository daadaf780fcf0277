//! Diamond Supermarket (dsmonline.pk)

use crate::sites::generic_price_selectors;
use crate::traits::{AdapterConfig, SiteAdapter, Strategy};

/// Adapter for dsmonline.pk, served as static HTML
pub struct DiamondAdapter {
    config: AdapterConfig,
}

impl DiamondAdapter {
    pub fn new() -> Self {
        let config = AdapterConfig {
            name: "Diamond".to_string(),
            domains: vec!["dsmonline.pk".to_string()],
            strategies: vec![Strategy::SelectorCascade, Strategy::FullDocument],
            structured_keys: Vec::new(),
            price_selectors: generic_price_selectors(),
            price_attributes: Vec::new(),
            text_bounds: None,
            content_scopes: Vec::new(),
            render: None,
        };

        Self { config }
    }
}

impl SiteAdapter for DiamondAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }
}
