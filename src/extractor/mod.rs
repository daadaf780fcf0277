//! Price extraction cascade over a page snapshot

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::models::Price;
use crate::parser::PriceTextParser;
use crate::traits::{AdapterConfig, Strategy};

/// Elements whose text is never shown to a visitor
const HIDDEN_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script").expect("script selector is valid"));

type StrategyFn = fn(&PriceExtractor, &Html, &AdapterConfig) -> Option<Price>;

/// A validated price and the strategy that found it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extraction {
    pub price: Price,
    pub strategy: Strategy,
}

/// Runs a site's strategy cascade, first validated price wins
#[derive(Debug, Clone, Default)]
pub struct PriceExtractor {
    parser: PriceTextParser,
}

impl PriceExtractor {
    pub fn new(parser: PriceTextParser) -> Self {
        Self { parser }
    }

    /// Extract a price from raw page HTML using the site's cascade
    pub fn extract(&self, html: &str, config: &AdapterConfig) -> Option<Extraction> {
        let document = Html::parse_document(html);

        config.strategies.iter().find_map(|&strategy| {
            let price = strategy_fn(strategy)(self, &document, config)?;
            debug!("{}: {} matched {}", config.name, strategy.as_str(), price);
            Some(Extraction { price, strategy })
        })
    }

    /// Scan embedded script blobs for known price keys, most specific key first
    fn structured_data(&self, document: &Html, config: &AdapterConfig) -> Option<Price> {
        if config.structured_keys.is_empty() {
            return None;
        }

        let blobs: Vec<String> = document
            .select(&SCRIPT)
            .map(|script| script.text().collect::<String>())
            .filter(|text| !text.trim().is_empty())
            .collect();

        config.structured_keys.iter().find_map(|key| {
            // Tolerates escaped quotes from JSON embedded in JS strings
            let pattern = Regex::new(&format!(
                r#"\\?"{}\\?"\s*:\s*\\?"?(\d+(?:\.\d+)?)"#,
                regex::escape(key)
            ))
            .ok()?;

            blobs.iter().find_map(|blob| {
                pattern
                    .captures_iter(blob)
                    .filter_map(|caps| caps.get(1))
                    .find_map(|value| self.parser.validate(value.as_str()))
            })
        })
    }

    fn rendered_primary(&self, document: &Html, config: &AdapterConfig) -> Option<Price> {
        let render = config.render.as_ref()?;
        let selector = Selector::parse(&render.wait_selector).ok()?;
        let element = document.select(&selector).next()?;
        self.parser.parse(&visible_text(element))
    }

    /// Lowest validated price among all fallback elements
    fn rendered_minimum(&self, document: &Html, config: &AdapterConfig) -> Option<Price> {
        let render = config.render.as_ref()?;

        render
            .fallback_selectors
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .flat_map(|selector| {
                document
                    .select(&selector)
                    .filter_map(|element| self.parser.parse(&visible_text(element)))
                    .collect::<Vec<_>>()
            })
            .min()
    }

    /// Probe selectors in order; within a selector, elements in document order
    fn selector_cascade(&self, document: &Html, config: &AdapterConfig) -> Option<Price> {
        config
            .price_selectors
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .find_map(|selector| {
                document
                    .select(&selector)
                    .find_map(|element| self.element_price(element, config))
            })
    }

    fn element_price(&self, element: ElementRef<'_>, config: &AdapterConfig) -> Option<Price> {
        // A bare price attribute is more reliable than the rendered text
        let from_attribute = config
            .price_attributes
            .iter()
            .filter_map(|name| element.value().attr(name))
            .find_map(|value| self.parser.validate(value));
        if from_attribute.is_some() {
            return from_attribute;
        }

        let text = visible_text(element);
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if let Some(bounds) = &config.text_bounds
            && !bounds.contains(&text.chars().count())
        {
            return None;
        }

        self.parser.parse(&text)
    }

    fn scoped_text(&self, document: &Html, config: &AdapterConfig) -> Option<Price> {
        config
            .content_scopes
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .find_map(|selector| {
                let region = document.select(&selector).next()?;
                self.parser.parse(&visible_text(region))
            })
    }

    fn full_document(&self, document: &Html, _config: &AdapterConfig) -> Option<Price> {
        self.parser.parse(&visible_text(document.root_element()))
    }
}

fn strategy_fn(strategy: Strategy) -> StrategyFn {
    match strategy {
        Strategy::StructuredData => PriceExtractor::structured_data,
        Strategy::RenderedPrimary => PriceExtractor::rendered_primary,
        Strategy::RenderedMinimum => PriceExtractor::rendered_minimum,
        Strategy::SelectorCascade => PriceExtractor::selector_cascade,
        Strategy::ScopedText => PriceExtractor::scoped_text,
        Strategy::FullDocument => PriceExtractor::full_document,
    }
}

/// Text a visitor would see, with script and style contents left out
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if HIDDEN_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}
