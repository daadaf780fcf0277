use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::transport::{FetchRequest, PageSnapshot, Transport, USER_AGENT};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless Chrome session for client-side rendered storefronts
pub struct BrowserTransport {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserTransport {
    /// Launch a browser. Chrome or Chromium must be installed and in PATH.
    pub async fn launch(headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .window_size(1920, 1080);

        if !headless {
            builder = builder.with_head();
        }

        let config = builder
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        Ok(Self { browser, handler })
    }

    async fn open(&self, url: &str) -> Result<Page, FetchError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| FetchError::Rendering(format!("Failed to create page: {e}")))?;

        page.set_user_agent(USER_AGENT)
            .await
            .map_err(|e| FetchError::Rendering(format!("Failed to set user agent: {e}")))?;

        page.wait_for_navigation()
            .await
            .map_err(|e| FetchError::Rendering(format!("Navigation failed: {e}")))?;

        Ok(page)
    }
}

async fn wait_for_element(page: &Page, selector: &str) {
    while page.find_element(selector).await.is_err() {
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[async_trait]
impl Transport for BrowserTransport {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<PageSnapshot, FetchError> {
        let page = tokio::time::timeout(request.timeout, self.open(request.url))
            .await
            .map_err(|_| {
                FetchError::Transient(format!(
                    "navigation to {} timed out after {:?}",
                    request.url, request.timeout
                ))
            })??;

        // Elapsing only cancels the wait; the page is still captured for the fallback strategies
        let mut wait_timed_out = false;
        if let Some(render) = request.render {
            let waited = tokio::time::timeout(
                render.wait_timeout,
                wait_for_element(&page, &render.wait_selector),
            )
            .await;

            if waited.is_err() {
                wait_timed_out = true;
                warn!(
                    "{} not present after {:?} on {}",
                    render.wait_selector, render.wait_timeout, request.url
                );
            }
        }

        let content = page.content().await;
        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", request.url, e);
        }

        let html = content.map_err(|e| FetchError::Rendering(format!("Failed to read DOM: {e}")))?;

        Ok(PageSnapshot {
            url: request.url.to_string(),
            html,
            wait_timed_out,
        })
    }
}

impl Drop for BrowserTransport {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
