//! Traits and configuration for site-specific price extraction

use std::ops::RangeInclusive;
use std::time::Duration;

use scraper::Selector;
use url::Url;

use crate::error::ConfigError;

/// One step of the extraction cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Key/value scan of embedded script blobs
    StructuredData,
    /// The rendered site's primary wait element
    RenderedPrimary,
    /// Lowest price among the rendered site's fallback elements
    RenderedMinimum,
    /// Site-specific selector list
    SelectorCascade,
    /// Text of the main content region
    ScopedText,
    /// Text of the whole page
    FullDocument,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StructuredData => "structured-data",
            Self::RenderedPrimary => "rendered-primary",
            Self::RenderedMinimum => "rendered-minimum",
            Self::SelectorCascade => "selector-cascade",
            Self::ScopedText => "scoped-text",
            Self::FullDocument => "full-document",
        }
    }
}

/// How to fetch and probe a client-side rendered site
#[derive(Debug, Clone)]
pub struct RenderSpec {
    /// Element to block on until present
    pub wait_selector: String,
    /// Elements probed when the primary element is missing; the lowest price wins
    pub fallback_selectors: Vec<String>,
    /// Upper bound for the primary element wait
    pub wait_timeout: Duration,
}

/// Configuration for a competitor site
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Competitor name, used as the reconciliation key
    pub name: String,
    /// Hosts served by this competitor, subdomains included
    pub domains: Vec<String>,
    /// Cascade, in priority order
    pub strategies: Vec<Strategy>,
    /// Structured-data keys, most specific first
    pub structured_keys: Vec<String>,
    /// CSS selectors probed by the selector cascade
    pub price_selectors: Vec<String>,
    /// Attributes holding a bare price value, preferred over element text
    pub price_attributes: Vec<String>,
    /// Element text outside these bounds is skipped by the selector cascade
    pub text_bounds: Option<RangeInclusive<usize>>,
    /// Main content regions, in priority order
    pub content_scopes: Vec<String>,
    pub render: Option<RenderSpec>,
}

impl AdapterConfig {
    /// Every CSS selector referenced by this configuration
    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        let render = self.render.iter().flat_map(|render| {
            std::iter::once(render.wait_selector.as_str())
                .chain(render.fallback_selectors.iter().map(String::as_str))
        });

        self.price_selectors
            .iter()
            .chain(self.content_scopes.iter())
            .map(String::as_str)
            .chain(render)
    }

    /// Check that every selector parses
    pub fn validate(&self) -> Result<(), ConfigError> {
        for selector in self.selectors() {
            Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
                site: self.name.clone(),
                selector: selector.to_string(),
            })?;
        }

        if self.render.is_none()
            && self
                .strategies
                .iter()
                .any(|s| matches!(s, Strategy::RenderedPrimary | Strategy::RenderedMinimum))
        {
            return Err(ConfigError::InvalidValue {
                key: format!("{} strategies", self.name),
                value: "rendered strategy without rendering settings".to_string(),
            });
        }

        Ok(())
    }
}

/// Site adapter: where and how to look for price signal on one competitor's markup
pub trait SiteAdapter: Send + Sync {
    /// Get the configuration for this site
    fn config(&self) -> &AdapterConfig;

    fn name(&self) -> &str {
        &self.config().name
    }

    fn strategies(&self) -> &[Strategy] {
        &self.config().strategies
    }

    fn render(&self) -> Option<&RenderSpec> {
        self.config().render.as_ref()
    }

    /// Whether pages must be fetched through a rendering transport
    fn requires_render(&self) -> bool {
        self.render().is_some()
    }

    /// Check whether `url` points at one of this site's domains
    fn matches_url(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        self.config().domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}
