//! Page transports: plain HTTP for static storefronts, headless Chrome for rendered ones

mod browser;
mod http;

use std::time::Duration;

use async_trait::async_trait;

pub use browser::BrowserTransport;
pub use http::HttpTransport;

use crate::error::FetchError;
use crate::traits::RenderSpec;

/// Headers sent by both transports
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A single page fetch
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    /// Present for client-side rendered sites
    pub render: Option<&'a RenderSpec>,
    pub timeout: Duration,
}

/// The DOM as seen after fetching (and, for rendered sites, waiting)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    /// The primary element wait elapsed before the element appeared
    pub wait_timed_out: bool,
}

impl PageSnapshot {
    /// Snapshot of a page that needed no rendering wait
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            wait_timed_out: false,
        }
    }
}

/// Trait for page fetching implementations
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<PageSnapshot, FetchError>;
}
