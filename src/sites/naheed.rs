//! Naheed (naheed.pk)

use crate::sites::generic_price_selectors;
use crate::traits::{AdapterConfig, SiteAdapter, Strategy};

pub struct NaheedAdapter {
    config: AdapterConfig,
}

impl NaheedAdapter {
    pub fn new() -> Self {
        let config = AdapterConfig {
            name: "Naheed".to_string(),
            domains: vec!["naheed.pk".to_string()],
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

impl SiteAdapter for NaheedAdapter {
    fn config(&self) -> &AdapterConfig {
        &self.config
    }
}
