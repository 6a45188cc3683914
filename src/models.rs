//! Core data models used throughout Site Harness.
//!
//! These types describe a crawl invocation, the records stored in the
//! vector index, and the results handed back to callers.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use url::Url;

/// Parameters of one crawl invocation. Immutable once built.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    base_url: Url,
    max_pages: usize,
    exclude_patterns: Vec<String>,
}

impl CrawlRequest {
    /// Validate and build a request.
    ///
    /// Rejects a `base_url` that is not an absolute `http`/`https` URL with a
    /// host, and a `max_pages` of zero. Empty exclusion patterns are dropped
    /// (an empty substring would match every URL) and duplicates collapse.
    pub fn new<I, S>(base_url: &str, max_pages: usize, exclude_patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid base_url: '{}'", base_url))?;
        match base_url.scheme() {
            "http" | "https" => {}
            other => bail!("invalid base_url: unsupported scheme '{}'", other),
        }
        if base_url.host_str().map_or(true, str::is_empty) {
            bail!("invalid base_url: '{}' has no host", base_url);
        }
        if max_pages == 0 {
            bail!("invalid max_pages: must be >= 1");
        }

        let mut patterns: Vec<String> = Vec::new();
        for p in exclude_patterns {
            let p: String = p.into();
            if !p.is_empty() && !patterns.contains(&p) {
                patterns.push(p);
            }
        }

        Ok(Self {
            base_url,
            max_pages,
            exclude_patterns: patterns,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_patterns
    }
}

/// One indexed page: the vector index key is `url`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecord {
    pub url: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A raw k-NN match returned by a [`VectorIndex`](crate::store::VectorIndex).
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub url: String,
    pub text: String,
    /// Similarity to the query vector; higher is closer.
    pub score: f32,
}

/// A ranked answer snippet produced by the query engine.
#[derive(Debug, Clone, Serialize)]
pub struct QueryHit {
    /// 1-based position, ordered by descending similarity.
    pub rank: usize,
    pub url: String,
    pub snippet: String,
    pub score: f32,
}

/// Lifecycle of one crawl invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

/// Pipeline stage at which a page dropped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Fetch,
    Embed,
    Upsert,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageFailure {
    pub url: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome of a crawl, used for the user-facing summary.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub base_url: String,
    pub state: CrawlState,
    /// Number of page records written to the index.
    pub indexed: usize,
    /// Visited URLs in visit order.
    pub visited: Vec<String>,
    /// Visited pages whose extracted text was empty.
    pub empty_pages: usize,
    pub failures: Vec<PageFailure>,
    /// Set when the crawl failed before producing results.
    pub error: Option<String>,
}

impl CrawlReport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: CrawlState::Idle,
            indexed: 0,
            visited: Vec::new(),
            empty_pages: 0,
            failures: Vec::new(),
            error: None,
        }
    }

    /// A report for a crawl that could not start or aborted early.
    pub fn failed(base_url: impl Into<String>, error: impl Into<String>) -> Self {
        let mut report = Self::new(base_url);
        report.state = CrawlState::Failed;
        report.error = Some(error.into());
        report
    }

    pub fn fetch_failures(&self) -> usize {
        self.count_stage(FailureStage::Fetch)
    }

    /// Pages that were fetched and had content but never reached the index.
    pub fn not_indexed(&self) -> usize {
        self.count_stage(FailureStage::Embed) + self.count_stage(FailureStage::Upsert)
    }

    fn count_stage(&self, stage: FailureStage) -> usize {
        self.failures.iter().filter(|f| f.stage == stage).count()
    }
}
