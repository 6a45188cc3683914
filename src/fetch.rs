//! HTTP fetch capability.
//!
//! The crawler depends only on the [`Fetcher`] trait so tests can serve
//! pages from memory. [`HttpFetcher`] is the production implementation on
//! top of `reqwest`, with a per-request timeout (10 s by default).
//!
//! Every failure (transport error, timeout, non-2xx status, unreadable
//! body) surfaces as a [`FetchError`]; the crawler treats them all the same.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::CrawlConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to read response body: {0}")]
    Body(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// A successfully fetched (2xx) response.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// How the crawler should read a fetched body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Html,
    PlainText,
    Other,
}

impl FetchedPage {
    pub fn html(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            status: 200,
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: body.into(),
        }
    }

    /// Classify the body by `Content-Type`; a missing header is read as HTML.
    pub fn kind(&self) -> BodyKind {
        let Some(ct) = self.content_type.as_deref() else {
            return BodyKind::Html;
        };
        let ct = ct.to_ascii_lowercase();
        if ct.contains("html") {
            BodyKind::Html
        } else if ct.starts_with("text/") {
            BodyKind::PlainText
        } else {
            BodyKind::Other
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// `reqwest`-backed fetcher.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> anyhow::Result<Self> {
        Self::with_timeout(Duration::from_secs(config.timeout_secs), &config.user_agent)
    }

    pub fn with_timeout(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(url.to_string()));
        }

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Body(e.to_string())
            }
        })?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

impl HttpFetcher {
    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Http(err)
        }
    }
}
