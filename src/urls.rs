//! Link resolution and frontier admission rules.
//!
//! A discovered link is admitted to the crawl frontier when, after being
//! resolved against the page it was found on:
//!
//! 1. it is an `http`/`https` URL,
//! 2. its network location (host plus explicit port) equals the base URL's,
//! 3. no exclusion pattern occurs anywhere in its text.
//!
//! Exclusion is a plain substring test, not a glob or regex: `"/admin"`
//! rejects `/admin/login` and also `/superadmin`.

use url::Url;

use crate::models::CrawlRequest;

/// Host with an explicit non-default port, e.g. `example.test` or `example.test:8080`.
pub fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Admission policy for one crawl.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    netloc: String,
    exclude: Vec<String>,
}

impl LinkFilter {
    pub fn new(base_url: &Url, exclude: &[String]) -> Self {
        Self {
            netloc: netloc(base_url).unwrap_or_default(),
            exclude: exclude.to_vec(),
        }
    }

    pub fn for_request(request: &CrawlRequest) -> Self {
        Self::new(request.base_url(), request.exclude_patterns())
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.exclude.iter().any(|p| url.contains(p.as_str()))
    }

    pub fn same_site(&self, url: &Url) -> bool {
        netloc(url).is_some_and(|n| n == self.netloc)
    }

    /// Whether an already-absolute URL may be visited.
    pub fn admits(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && self.same_site(url) && !self.is_excluded(url.as_str())
    }

    /// Resolve `href` against the page it appeared on and apply the
    /// admission rules. The fragment is dropped since it addresses the same
    /// document.
    pub fn resolve(&self, page_url: &Url, href: &str) -> Option<Url> {
        let mut url = page_url.join(href.trim()).ok()?;
        url.set_fragment(None);
        self.admits(&url).then_some(url)
    }
}
