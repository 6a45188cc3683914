//! Application wiring and host-facing operations.
//!
//! [`App`] builds the collaborators once from a [`Config`] (database pool,
//! vector index, embedding provider, HTTP fetcher) and hands them to a
//! [`Crawler`] or [`QueryEngine`] per call. The CLI and the tool server both
//! go through it.
//!
//! The `*_site` / `scrape_url` methods always return a human-readable
//! string, never an error: failures are folded into the text.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{Config, RecrawlPolicy};
use crate::crawl::Crawler;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::extract::{html_to_text, normalize_lines};
use crate::fetch::{BodyKind, Fetcher, HttpFetcher};
use crate::models::{CrawlReport, CrawlRequest, CrawlState};
use crate::query::{format_answer, AskOutcome, QueryEngine};
use crate::sqlite_store::SqliteIndex;
use crate::store::VectorIndex;
use crate::urls::netloc;
use crate::{db, migrate};

/// Lines of extracted text returned by [`scrape`].
pub const SCRAPE_MAX_LINES: usize = 2000;

/// Summary of the vector index contents.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub pages: usize,
    pub hosts: Vec<String>,
}

pub struct App {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    shutdown: CancellationToken,
}

impl App {
    /// Open the database (creating the schema if needed) and build the
    /// configured embedding provider and HTTP fetcher.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool)
            .await
            .context("Failed to create index schema")?;

        let embedder = create_provider(&config.embedding)?;
        let index = Arc::new(SqliteIndex::new(pool, embedder.model_name()));
        let fetcher = Arc::new(HttpFetcher::new(&config.crawl)?);

        Ok(Self::from_parts(config.clone(), fetcher, embedder, index))
    }

    /// Assemble an app from explicit collaborators.
    pub fn from_parts(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            embedder,
            index,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cancel every crawl started from this app, now and later.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Run one crawl. `max_pages` falls back to `[crawl].max_pages`, and
    /// `exclude` is merged with `[crawl].exclude`.
    pub async fn crawl(
        &self,
        base_url: &str,
        max_pages: Option<usize>,
        exclude: &[String],
    ) -> CrawlReport {
        let crawl_cfg = &self.config.crawl;
        let patterns = crawl_cfg.exclude.iter().chain(exclude.iter()).cloned();
        let request = match CrawlRequest::new(
            base_url,
            max_pages.unwrap_or(crawl_cfg.max_pages),
            patterns,
        ) {
            Ok(r) => r,
            Err(e) => return CrawlReport::failed(base_url, e.to_string()),
        };

        if !self.config.embedding.is_enabled() {
            return CrawlReport::failed(
                request.base_url().as_str(),
                "Embedding provider is disabled. Set [embedding] provider in config.",
            );
        }

        if crawl_cfg.on_recrawl == RecrawlPolicy::Reset {
            let host = netloc(request.base_url()).unwrap_or_default();
            match self.index.remove_host(&host).await {
                Ok(removed) => tracing::info!(%host, removed, "cleared previous crawl"),
                Err(e) => {
                    return CrawlReport::failed(
                        request.base_url().as_str(),
                        format!("failed to reset index for {}: {}", host, e),
                    )
                }
            }
        }

        let crawler = Crawler::new(
            self.fetcher.clone(),
            self.embedder.clone(),
            self.index.clone(),
        )
        .with_concurrency(crawl_cfg.concurrency)
        .with_batch_size(self.config.embedding.batch_size);

        crawler
            .crawl(&request, &self.shutdown.child_token())
            .await
    }

    pub async fn crawl_site(
        &self,
        base_url: &str,
        max_pages: Option<usize>,
        exclude: &[String],
    ) -> String {
        format_crawl_summary(&self.crawl(base_url, max_pages, exclude).await)
    }

    /// `top_k` falls back to `[retrieval].top_k`.
    pub async fn ask(&self, question: &str, top_k: Option<usize>) -> AskOutcome {
        QueryEngine::new(self.embedder.clone(), self.index.clone())
            .with_snippet_chars(self.config.retrieval.snippet_chars)
            .ask(question, top_k.unwrap_or(self.config.retrieval.top_k))
            .await
    }

    pub async fn ask_site(&self, question: &str, top_k: Option<usize>) -> String {
        format_answer(&self.ask(question, top_k).await)
    }

    pub async fn scrape_url(&self, url: &str) -> String {
        scrape_url(self.fetcher.as_ref(), url).await
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            pages: self.index.count().await?,
            hosts: self.index.hosts().await?,
        })
    }
}

/// Fetch one page and return its text, cut to [`SCRAPE_MAX_LINES`] lines.
pub async fn scrape(fetcher: &dyn Fetcher, url: &str) -> Result<String> {
    let parsed = Url::parse(url.trim()).context("invalid URL")?;
    let page = fetcher.fetch(&parsed).await?;
    let text = match page.kind() {
        BodyKind::Html => html_to_text(&page.body),
        BodyKind::PlainText => normalize_lines(&page.body),
        BodyKind::Other => String::new(),
    };
    Ok(text
        .lines()
        .take(SCRAPE_MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// [`scrape`], with failures rendered as `Error scraping <url>: <reason>`.
pub async fn scrape_url(fetcher: &dyn Fetcher, url: &str) -> String {
    match scrape(fetcher, url).await {
        Ok(text) => text,
        Err(e) => format!("Error scraping {}: {}", url, e),
    }
}

/// Render a crawl report as the `crawl_site` summary.
///
/// The first line always carries the indexed count, zero included.
pub fn format_crawl_summary(report: &CrawlReport) -> String {
    let mut out = format!(
        "Crawled and indexed {} pages from {}",
        report.indexed, report.base_url
    );
    match report.state {
        CrawlState::Failed => {
            out.push_str(&format!(
                "\nCrawl failed: {}",
                report.error.as_deref().unwrap_or("unknown error")
            ));
        }
        _ => {
            out.push_str(&format!(
                "\nVisited {} pages ({} without text), {} failed to fetch, {} not indexed",
                report.visited.len(),
                report.empty_pages,
                report.fetch_failures(),
                report.not_indexed()
            ));
            if report.state == CrawlState::Cancelled {
                out.push_str("\nCrawl cancelled before completion");
            }
        }
    }
    out
}
