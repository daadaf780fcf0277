//! Competitor site adapters and the domain lookup table

mod diamond;
mod metro;
mod naheed;

use std::sync::Arc;
use std::time::Duration;

pub use diamond::DiamondAdapter;
pub use metro::MetroAdapter;
pub use naheed::NaheedAdapter;

use crate::error::ConfigError;
use crate::traits::SiteAdapter;

/// Price selectors shared by the storefronts without site-specific markup
pub(crate) fn generic_price_selectors() -> Vec<String> {
    [
        ".price",
        ".product-price",
        ".amount",
        "[class*=\"price\"]",
        "[class*=\"Price\"]",
        ".current-price",
        ".regular-price",
        ".product-details-price",
        ".price-box",
        ".price-wrapper",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// All known site adapters, selected by competitor name or by link domain
#[derive(Clone)]
pub struct SiteRegistry {
    adapters: Vec<Arc<dyn SiteAdapter>>,
}

impl SiteRegistry {
    /// Build a registry from adapters, validating each one's selectors
    pub fn new(adapters: Vec<Arc<dyn SiteAdapter>>) -> Result<Self, ConfigError> {
        for adapter in &adapters {
            adapter.config().validate()?;
        }

        Ok(Self { adapters })
    }

    /// Registry with every shipped site
    pub fn with_defaults(render_wait: Duration) -> Result<Self, ConfigError> {
        Self::new(vec![
            Arc::new(DiamondAdapter::new()),
            Arc::new(NaheedAdapter::new()),
            Arc::new(MetroAdapter::new(render_wait)),
        ])
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    pub fn for_url(&self, url: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.matches_url(url))
            .cloned()
    }

    /// Resolve an ordered competitor list to adapters
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Arc<dyn SiteAdapter>>, ConfigError> {
        names
            .iter()
            .map(|name| {
                self.by_name(name)
                    .ok_or_else(|| ConfigError::UnknownCompetitor(name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{AdapterConfig, Strategy};

    fn registry() -> SiteRegistry {
        SiteRegistry::with_defaults(Duration::from_secs(20)).unwrap()
    }

    #[test]
    fn test_default_sites_are_valid() {
        let registry = registry();
        assert!(registry.by_name("Diamond").is_some());
        assert!(registry.by_name("naheed").is_some());
        assert!(registry.by_name("METRO").unwrap().requires_render());
        assert!(!registry.by_name("Diamond").unwrap().requires_render());
    }

    #[test]
    fn test_domain_lookup() {
        let registry = registry();

        let metro = registry
            .for_url("https://www.metro-online.pk/detail/grocery/123")
            .unwrap();
        assert_eq!(metro.name(), "Metro");

        let diamond = registry.for_url("https://dsmonline.pk/product/rice").unwrap();
        assert_eq!(diamond.name(), "Diamond");

        assert!(registry.for_url("https://www.cartpk.com/item/1").is_none());
        assert!(registry.for_url("https://notnaheed.pk/item").is_none());
        assert!(registry.for_url("not a url").is_none());
    }

    #[test]
    fn test_resolve_unknown_competitor() {
        let registry = registry();
        let err = registry
            .resolve(&["Diamond".to_string(), "Imtiaz".to_string()])
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::UnknownCompetitor("Imtiaz".to_string()));
    }

    struct BrokenAdapter(AdapterConfig);

    impl SiteAdapter for BrokenAdapter {
        fn config(&self) -> &AdapterConfig {
            &self.0
        }
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let adapter = BrokenAdapter(AdapterConfig {
            name: "Broken".to_string(),
            domains: vec!["broken.pk".to_string()],
            strategies: vec![Strategy::SelectorCascade],
            structured_keys: Vec::new(),
            price_selectors: vec!["div[".to_string()],
            price_attributes: Vec::new(),
            text_bounds: None,
            content_scopes: Vec::new(),
            render: None,
        });

        let result = SiteRegistry::new(vec![Arc::new(adapter)]);
        assert!(matches!(result, Err(ConfigError::InvalidSelector { .. })));
    }
}
