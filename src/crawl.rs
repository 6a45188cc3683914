//! Bounded breadth-first site crawler.
//!
//! The [`Crawler`] owns the frontier and the visited set for one crawl and
//! is the only place that mutates them. Fetching and text extraction run
//! concurrently; every other decision (dedup, enqueue, embed, upsert)
//! happens in the coordinating task.
//!
//! # Waves
//!
//! Each iteration pops a *wave* of up to
//! `min(concurrency, max_pages - visited)` URLs from the frontier head and
//! fetches them through an ordered, bounded stream. Results are applied in
//! pop order, so the visit order is exactly the one a sequential BFS would
//! produce, and the visited set can never overshoot `max_pages`.
//!
//! Pages with text from one wave are embedded in batches of
//! `batch_size` and upserted one by one. When the embedder rejects a batch,
//! its pages are embedded again one at a time, so only the pages that fail
//! on their own are recorded as not indexed. The crawl carries on either way.
//!
//! # Failures
//!
//! A failed fetch leaves the URL unvisited and its links unexplored. The
//! URL stays in the "seen" set, so it is never queued or fetched again
//! within the same crawl.
//!
//! # Cancellation
//!
//! Cancelling the token abandons the wave in flight and stops scheduling
//! new ones. Records already upserted stay in the index.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::extract::{normalize_lines, parse_page};
use crate::fetch::{BodyKind, FetchError, Fetcher};
use crate::models::{CrawlReport, CrawlRequest, CrawlState, FailureStage, PageFailure, PageRecord};
use crate::store::VectorIndex;
use crate::urls::LinkFilter;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Text and links pulled out of one successfully fetched page.
struct Visit {
    /// URL after redirects; links resolve against it.
    final_url: Url,
    text: String,
    links: Vec<String>,
}

pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    concurrency: usize,
    batch_size: usize,
}

impl Crawler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            fetcher,
            embedder,
            index,
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Crawl `request.base_url()` breadth-first until the frontier is empty,
    /// `max_pages` pages have been visited, or `cancel` fires.
    ///
    /// Never fails: per-page problems land in [`CrawlReport::failures`].
    pub async fn crawl(&self, request: &CrawlRequest, cancel: &CancellationToken) -> CrawlReport {
        let filter = LinkFilter::for_request(request);
        let max_pages = request.max_pages();

        let mut report = CrawlReport::new(request.base_url().as_str());
        report.state = CrawlState::Running;

        let mut seed = request.base_url().clone();
        seed.set_fragment(None);

        let mut frontier: VecDeque<Url> = VecDeque::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        seen.insert(seed.to_string());
        frontier.push_back(seed);

        tracing::info!(
            base_url = %request.base_url(),
            max_pages,
            exclude = ?request.exclude_patterns(),
            concurrency = self.concurrency,
            "crawl started"
        );

        while !frontier.is_empty() && visited.len() < max_pages {
            if cancel.is_cancelled() {
                report.state = CrawlState::Cancelled;
                break;
            }

            let budget = self.concurrency.min(max_pages - visited.len());
            let mut wave = Vec::with_capacity(budget);
            while wave.len() < budget {
                let Some(url) = frontier.pop_front() else {
                    break;
                };
                if visited.contains(url.as_str()) || filter.is_excluded(url.as_str()) {
                    tracing::debug!(url = %url, "skipping excluded or visited URL");
                    continue;
                }
                wave.push(url);
            }
            if wave.is_empty() {
                continue;
            }

            let fetches = futures::stream::iter(wave.iter().cloned().map(|url| self.visit(url)))
                .buffered(self.concurrency)
                .collect::<Vec<_>>();

            let results = tokio::select! {
                _ = cancel.cancelled() => {
                    report.state = CrawlState::Cancelled;
                    break;
                }
                results = fetches => results,
            };

            let mut to_index: Vec<(String, String)> = Vec::new();
            for (url, result) in wave.into_iter().zip(results) {
                let visit = match result {
                    Ok(visit) => visit,
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "fetch failed, skipping");
                        report.failures.push(PageFailure {
                            url: url.to_string(),
                            stage: FailureStage::Fetch,
                            message: e.to_string(),
                        });
                        continue;
                    }
                };

                let key = url.to_string();
                visited.insert(key.clone());
                report.visited.push(key.clone());

                if visit.final_url != url && filter.admits(&visit.final_url) {
                    seen.insert(visit.final_url.to_string());
                }

                if visit.text.is_empty() {
                    tracing::debug!(url = %key, "no indexable text");
                    report.empty_pages += 1;
                } else {
                    to_index.push((key, visit.text));
                }

                for href in &visit.links {
                    if let Some(link) = filter.resolve(&visit.final_url, href) {
                        if seen.insert(link.to_string()) {
                            frontier.push_back(link);
                        }
                    }
                }
            }

            self.index_pages(to_index, &mut report).await;
        }

        if report.state == CrawlState::Running {
            report.state = CrawlState::Completed;
        }

        tracing::info!(
            base_url = %request.base_url(),
            state = ?report.state,
            indexed = report.indexed,
            visited = report.visited.len(),
            failed = report.failures.len(),
            "crawl finished"
        );

        report
    }

    /// Fetch one URL and extract its text and links.
    async fn visit(&self, url: Url) -> Result<Visit, FetchError> {
        tracing::debug!(url = %url, "fetching");
        let page = self.fetcher.fetch(&url).await?;

        let (text, links) = match page.kind() {
            BodyKind::Html => {
                let parsed = parse_page(&page.body);
                (parsed.text, parsed.links)
            }
            BodyKind::PlainText => (normalize_lines(&page.body), Vec::new()),
            BodyKind::Other => (String::new(), Vec::new()),
        };

        Ok(Visit {
            final_url: page.url,
            text,
            links,
        })
    }

    /// Embed `pages` in batches and upsert each resulting record.
    ///
    /// A batch the embedder rejects is retried one page at a time, so a
    /// single bad page only fails itself.
    async fn index_pages(&self, pages: Vec<(String, String)>, report: &mut CrawlReport) {
        for batch in pages.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();

            let embedded: Vec<(&(String, String), Result<Vec<f32>, String>)> =
                match self.embedder.embed(&texts).await {
                    Ok(vectors) if vectors.len() == batch.len() => {
                        batch.iter().zip(vectors.into_iter().map(Ok)).collect()
                    }
                    Ok(vectors) if batch.len() == 1 => {
                        let message =
                            format!("embedder returned {} vectors for 1 page", vectors.len());
                        vec![(&batch[0], Err(message))]
                    }
                    Err(e) if batch.len() == 1 => vec![(&batch[0], Err(e.to_string()))],
                    Ok(vectors) => {
                        tracing::warn!(
                            pages = batch.len(),
                            vectors = vectors.len(),
                            "embedding count mismatch, retrying page by page"
                        );
                        self.embed_each(batch).await
                    }
                    Err(e) => {
                        tracing::warn!(
                            pages = batch.len(),
                            error = %e,
                            "batch embedding failed, retrying page by page"
                        );
                        self.embed_each(batch).await
                    }
                };

            for ((url, text), embedding) in embedded {
                let embedding = match embedding {
                    Ok(embedding) => embedding,
                    Err(message) => {
                        tracing::warn!(url = %url, error = %message, "embedding failed");
                        report.failures.push(PageFailure {
                            url: url.clone(),
                            stage: FailureStage::Embed,
                            message,
                        });
                        continue;
                    }
                };

                let record = PageRecord {
                    url: url.clone(),
                    text: text.clone(),
                    embedding,
                };
                match self.index.upsert(&record).await {
                    Ok(()) => report.indexed += 1,
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "upsert failed");
                        report.failures.push(PageFailure {
                            url: url.clone(),
                            stage: FailureStage::Upsert,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    async fn embed_each<'a>(
        &self,
        batch: &'a [(String, String)],
    ) -> Vec<(&'a (String, String), Result<Vec<f32>, String>)> {
        let mut out = Vec::with_capacity(batch.len());
        for page in batch {
            let result = embed_query(self.embedder.as_ref(), &page.1)
                .await
                .map_err(|e| e.to_string());
            out.push((page, result));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashProvider;
    use crate::fetch::FetchedPage;
    use crate::store::memory::InMemoryIndex;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves pages from memory and records every fetch.
    #[derive(Default)]
    struct FakeSite {
        pages: HashMap<String, FetchedPage>,
        failing: HashSet<String>,
        fetched: Mutex<Vec<String>>,
        /// Fetching this URL cancels the token and never completes.
        cancel_at: Option<(String, CancellationToken)>,
    }

    impl FakeSite {
        fn page(mut self, url: &str, html: &str) -> Self {
            let parsed = Url::parse(url).unwrap();
            self.pages
                .insert(url.to_string(), FetchedPage::html(parsed, html));
            self
        }

        fn typed(mut self, url: &str, content_type: &str, body: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                FetchedPage {
                    url: Url::parse(url).unwrap(),
                    status: 200,
                    content_type: Some(content_type.to_string()),
                    body: body.to_string(),
                },
            );
            self
        }

        /// Serve `html` at `url` as if the request had been redirected to `to`.
        fn redirect(mut self, url: &str, to: &str, html: &str) -> Self {
            self.pages.insert(
                url.to_string(),
                FetchedPage::html(Url::parse(to).unwrap(), html),
            );
            self
        }

        fn failing(mut self, url: &str) -> Self {
            self.failing.insert(url.to_string());
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for FakeSite {
        async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
            self.fetched.lock().unwrap().push(url.to_string());
            if let Some((at, token)) = &self.cancel_at {
                if at == url.as_str() {
                    token.cancel();
                    std::future::pending::<()>().await;
                }
            }
            if self.failing.contains(url.as_str()) {
                return Err(FetchError::Status(500));
            }
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or(FetchError::Status(404))
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }
        fn dims(&self) -> usize {
            4
        }
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("model unavailable")
        }
    }

    /// Rejects any batch containing a text with `poison` in it.
    struct PickyEmbedder {
        inner: HashProvider,
        poison: &'static str,
    }

    #[async_trait]
    impl EmbeddingProvider for PickyEmbedder {
        fn model_name(&self) -> &str {
            "picky"
        }
        fn dims(&self) -> usize {
            self.inner.dims()
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.iter().any(|t| t.contains(self.poison)) {
                anyhow::bail!("input too long");
            }
            self.inner.embed(texts).await
        }
    }

    fn links(hrefs: &[&str]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|h| format!("<a href=\"{}\">{}</a>", h, h))
            .collect();
        format!("<html><body>{}</body></html>", anchors)
    }

    fn crawler(site: Arc<FakeSite>, index: Arc<InMemoryIndex>) -> Crawler {
        Crawler::new(site, Arc::new(HashProvider::new(32)), index)
    }

    fn request(max_pages: usize, exclude: &[&str]) -> CrawlRequest {
        CrawlRequest::new("http://example.test/", max_pages, exclude.iter().copied()).unwrap()
    }

    fn star_site() -> FakeSite {
        FakeSite::default()
            .page("http://example.test/", &links(&["/a", "/b", "/c"]))
            .page("http://example.test/a", "<p>Page A</p>")
            .page("http://example.test/b", "<p>Page B</p>")
            .page("http://example.test/c", "<p>Page C</p>")
    }

    #[tokio::test]
    async fn test_budget_stops_at_max_pages_in_bfs_order() {
        let site = Arc::new(star_site());
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site.clone(), index.clone())
            .crawl(&request(3, &[]), &CancellationToken::new())
            .await;

        assert_eq!(report.state, CrawlState::Completed);
        assert_eq!(
            report.visited,
            vec![
                "http://example.test/",
                "http://example.test/a",
                "http://example.test/b"
            ]
        );
        assert_eq!(report.indexed, 3);
        assert!(index.get("http://example.test/c").is_none());
        assert!(!site.fetched().contains(&"http://example.test/c".to_string()));
    }

    #[tokio::test]
    async fn test_budget_respected_with_single_worker() {
        let site = Arc::new(star_site());
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site, index)
            .with_concurrency(1)
            .crawl(&request(2, &[]), &CancellationToken::new())
            .await;
        assert_eq!(report.visited.len(), 2);
    }

    #[tokio::test]
    async fn test_excluded_link_never_visited() {
        let site = Arc::new(
            FakeSite::default()
                .page("http://example.test/", &links(&["/admin/login", "/about"]))
                .page("http://example.test/admin/login", "<p>secret</p>")
                .page("http://example.test/about", "<p>About us</p>"),
        );
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site.clone(), index.clone())
            .crawl(&request(10, &["/admin"]), &CancellationToken::new())
            .await;

        assert!(report.visited.iter().all(|u| !u.contains("/admin")));
        assert!(index.get("http://example.test/admin/login").is_none());
        assert!(site.fetched().iter().all(|u| !u.contains("/admin")));
        assert_eq!(report.indexed, 2);
    }

    #[tokio::test]
    async fn test_excluded_base_url_visits_nothing() {
        let site = Arc::new(star_site());
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site.clone(), index)
            .crawl(&request(5, &["example.test/"]), &CancellationToken::new())
            .await;
        assert_eq!(report.state, CrawlState::Completed);
        assert!(report.visited.is_empty());
        assert!(site.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_domain_confinement() {
        let site = Arc::new(
            FakeSite::default()
                .page(
                    "http://example.test/",
                    &links(&["http://other.test/", "http://sub.example.test/", "/in"]),
                )
                .page("http://other.test/", "<p>elsewhere</p>")
                .page("http://sub.example.test/", "<p>subdomain</p>")
                .page("http://example.test/in", "<p>inside</p>"),
        );
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site, index.clone())
            .crawl(&request(10, &[]), &CancellationToken::new())
            .await;

        assert_eq!(report.visited.len(), 2);
        assert_eq!(index.hosts().await.unwrap(), vec!["example.test"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_skipped_not_retried_and_not_counted() {
        let site = Arc::new(
            FakeSite::default()
                .page("http://example.test/", &links(&["/broken", "/ok"]))
                .page("http://example.test/ok", &links(&["/broken", "/"]))
                .failing("http://example.test/broken"),
        );
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site.clone(), index)
            .crawl(&request(10, &[]), &CancellationToken::new())
            .await;

        assert_eq!(
            report.visited,
            vec!["http://example.test/", "http://example.test/ok"]
        );
        assert_eq!(report.fetch_failures(), 1);
        let broken_fetches = site
            .fetched()
            .iter()
            .filter(|u| u.ends_with("/broken"))
            .count();
        assert_eq!(broken_fetches, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_does_not_consume_budget() {
        let site = Arc::new(
            FakeSite::default()
                .page("http://example.test/", &links(&["/x", "/a", "/b"]))
                .failing("http://example.test/x")
                .page("http://example.test/a", "<p>A</p>")
                .page("http://example.test/b", "<p>B</p>"),
        );
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site, index)
            .with_concurrency(1)
            .crawl(&request(3, &[]), &CancellationToken::new())
            .await;
        assert_eq!(report.visited.len(), 3);
        assert_eq!(report.indexed, 3);
    }

    #[tokio::test]
    async fn test_empty_page_visited_but_not_indexed() {
        let site = Arc::new(
            FakeSite::default()
                .page(
                    "http://example.test/",
                    "<html><body><script>x()</script><a href=\"/next\"></a></body></html>",
                )
                .page("http://example.test/next", "<p>Next page</p>"),
        );
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site, index.clone())
            .crawl(&request(5, &[]), &CancellationToken::new())
            .await;

        assert_eq!(report.visited.len(), 2);
        assert_eq!(report.empty_pages, 1);
        assert_eq!(report.indexed, 1);
        assert!(index.get("http://example.test/").is_none());
        assert!(index.get("http://example.test/next").is_some());
    }

    #[tokio::test]
    async fn test_non_html_bodies() {
        let site = Arc::new(
            FakeSite::default()
                .page("http://example.test/", &links(&["/notes.txt", "/logo.png"]))
                .typed("http://example.test/notes.txt", "text/plain", "  line one \n\n line two ")
                .typed("http://example.test/logo.png", "image/png", "\u{0089}PNG"),
        );
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site, index.clone())
            .crawl(&request(5, &[]), &CancellationToken::new())
            .await;

        assert_eq!(report.visited.len(), 3);
        assert_eq!(report.empty_pages, 1);
        let notes = index.get("http://example.test/notes.txt").unwrap();
        assert_eq!(notes.text, "line one\nline two");
    }

    #[tokio::test]
    async fn test_embedding_failure_counted_and_crawl_continues() {
        let site = Arc::new(star_site());
        let index = Arc::new(InMemoryIndex::new());
        let report = Crawler::new(site, Arc::new(FailingEmbedder), index.clone())
            .crawl(&request(10, &[]), &CancellationToken::new())
            .await;

        assert_eq!(report.state, CrawlState::Completed);
        assert_eq!(report.visited.len(), 4);
        assert_eq!(report.indexed, 0);
        assert_eq!(report.not_indexed(), 4);
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_no_duplicate_visits_on_cycles() {
        let site = Arc::new(
            FakeSite::default()
                .page("http://example.test/", &links(&["/a", "/a#top", "/b", "/"]))
                .page("http://example.test/a", &links(&["/", "/b", "/a"]))
                .page("http://example.test/b", &links(&["/a", "/"])),
        );
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site.clone(), index.clone())
            .crawl(&request(50, &[]), &CancellationToken::new())
            .await;

        assert_eq!(report.visited.len(), 3);
        assert_eq!(site.fetched().len(), 3);
        assert_eq!(index.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bfs_ordering_by_link_distance() {
        // / -> /a, /b ; /a -> /a1 ; /b -> /b1 ; /a1 -> /deep
        let site = Arc::new(
            FakeSite::default()
                .page("http://example.test/", &links(&["/a", "/b"]))
                .page("http://example.test/a", &links(&["/a1"]))
                .page("http://example.test/b", &links(&["/b1"]))
                .page("http://example.test/a1", &links(&["/deep"]))
                .page("http://example.test/b1", "<p>b1</p>")
                .page("http://example.test/deep", "<p>deep</p>"),
        );
        for concurrency in [1, 2, 8] {
            let index = Arc::new(InMemoryIndex::new());
            let report = crawler(site.clone(), index)
                .with_concurrency(concurrency)
                .crawl(&request(10, &[]), &CancellationToken::new())
                .await;
            let paths: Vec<&str> = report
                .visited
                .iter()
                .map(|u| u.trim_start_matches("http://example.test"))
                .collect();
            assert_eq!(paths, vec!["/", "/a", "/b", "/a1", "/b1", "/deep"]);
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let site = Arc::new(star_site());
        let index = Arc::new(InMemoryIndex::new());
        let token = CancellationToken::new();
        token.cancel();
        let report = crawler(site.clone(), index).crawl(&request(5, &[]), &token).await;
        assert_eq!(report.state, CrawlState::Cancelled);
        assert!(report.visited.is_empty());
        assert!(site.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_abandons_in_flight_fetch() {
        let token = CancellationToken::new();
        let mut site = star_site();
        site.cancel_at = Some(("http://example.test/".to_string(), token.clone()));
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(Arc::new(site), index)
            .crawl(&request(5, &[]), &token)
            .await;
        assert_eq!(report.state, CrawlState::Cancelled);
        assert_eq!(report.indexed, 0);
    }

    #[tokio::test]
    async fn test_one_bad_page_does_not_fail_its_batch() {
        let site = Arc::new(
            FakeSite::default()
                .page(
                    "http://example.test/",
                    r#"<a href="/a">A</a><a href="/poison">P</a><a href="/b">B</a>"#,
                )
                .page("http://example.test/a", "<p>Page A</p>")
                .page("http://example.test/poison", "<p>poison pill</p>")
                .page("http://example.test/b", "<p>Page B</p>"),
        );
        let embedder = Arc::new(PickyEmbedder {
            inner: HashProvider::new(32),
            poison: "poison",
        });
        let index = Arc::new(InMemoryIndex::new());
        let report = Crawler::new(site, embedder, index.clone())
            .crawl(&request(10, &[]), &CancellationToken::new())
            .await;

        assert_eq!(report.state, CrawlState::Completed);
        assert_eq!(report.visited.len(), 4);
        assert_eq!(report.indexed, 3);
        assert_eq!(report.not_indexed(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].url, "http://example.test/poison");
        assert_eq!(report.failures[0].stage, FailureStage::Embed);
        assert!(index.get("http://example.test/a").is_some());
        assert!(index.get("http://example.test/b").is_some());
        assert!(index.get("http://example.test/poison").is_none());
    }

    #[tokio::test]
    async fn test_cancel_keeps_pages_already_indexed() {
        let token = CancellationToken::new();
        let mut site = star_site();
        site.cancel_at = Some(("http://example.test/b".to_string(), token.clone()));
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(Arc::new(site), index.clone())
            .crawl(&request(10, &[]), &token)
            .await;

        assert_eq!(report.state, CrawlState::Cancelled);
        assert_eq!(report.visited, vec!["http://example.test/"]);
        assert_eq!(report.indexed, 1);
        assert!(index.get("http://example.test/").is_some());
        assert_eq!(index.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_redirect_indexed_under_requested_url() {
        let site = Arc::new(
            FakeSite::default()
                .page("http://example.test/", &links(&["/old", "/away"]))
                .redirect("http://example.test/old", "http://example.test/new", &links(&["/new", "/next"]))
                .redirect("http://example.test/away", "http://other.test/landing", &links(&["/more"]))
                .page("http://example.test/new", "<p>moved here</p>")
                .page("http://example.test/next", "<p>next</p>"),
        );
        let index = Arc::new(InMemoryIndex::new());
        let report = crawler(site.clone(), index.clone())
            .crawl(&request(10, &[]), &CancellationToken::new())
            .await;

        assert_eq!(
            report.visited,
            vec![
                "http://example.test/",
                "http://example.test/old",
                "http://example.test/away",
                "http://example.test/next"
            ]
        );
        // The redirect target was marked seen, so it is never fetched itself.
        assert!(!site.fetched().contains(&"http://example.test/new".to_string()));
        // Off-site targets are still indexed under the requested URL, but
        // their links resolve against the other host and are dropped.
        assert!(index.get("http://example.test/away").is_some());
        assert!(site.fetched().iter().all(|u| !u.contains("other.test")));
        assert!(index.get("http://other.test/landing").is_none());
    }
}
