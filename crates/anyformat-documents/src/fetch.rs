use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {0}")]
    Status(u16),
}

/// Retrieves the body of a URL as text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError>;
}

/// [`Fetcher`] backed by `reqwest`.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching document");

        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
