use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::debug;

use crate::error::FetchError;
use crate::transport::{FetchRequest, PageSnapshot, Transport, USER_AGENT};

/// Static HTML fetches over a shared reqwest session
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<PageSnapshot, FetchError> {
        debug!("GET {}", request.url);

        let response = self
            .client
            .get(request.url)
            .timeout(request.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let html = response.text().await?;
        debug!("Fetched {} bytes from {}", html.len(), request.url);

        Ok(PageSnapshot::from_html(request.url, html))
    }
}
