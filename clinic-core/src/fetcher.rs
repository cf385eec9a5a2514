//! Remote fetcher: the only component that talks to the publisher's site.
//!
//! Callers never surface a [`FetchError`]; any failure means "resource absent".
//! The trait is the seam the extractors are written against so tests can swap
//! the network for a canned map of responses.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;

use crate::config::SiteConfig;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Abstraction over plain GET requests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return the body. Any non-2xx status is an error.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;

    /// Fetch `url` and decode the body as (lossy) UTF-8.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let body = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// `reqwest`-backed fetcher. One instance is shared by every request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(site: &SiteConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(site.timeout_seconds))
            .user_agent(site.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "Remote resource unavailable");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?)
    }
}
