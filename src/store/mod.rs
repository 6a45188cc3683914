//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the persistent key-value store the crawler
//! writes to and the query engine reads from. Records are keyed by URL;
//! upserting an existing key replaces its text and embedding.
//!
//! Backends:
//! - [`memory::InMemoryIndex`]: process-local, used in tests.
//! - [`SqliteIndex`](crate::sqlite_store::SqliteIndex): durable, survives restarts.
//!
//! Implementations must be `Send + Sync` and safe under concurrent upserts
//! of distinct keys.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{IndexHit, PageRecord};

/// Persistent store of [`PageRecord`]s supporting k-nearest-neighbor search.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or replace the record for a URL |
/// | [`query`](VectorIndex::query) | Top-`k` records by similarity to a vector |
/// | [`count`](VectorIndex::count) | Number of stored records |
/// | [`remove_host`](VectorIndex::remove_host) | Delete every record of one network location |
/// | [`hosts`](VectorIndex::hosts) | Distinct network locations present |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, record: &PageRecord) -> Result<()>;

    /// Return at most `k` hits ordered by descending score; ties are broken
    /// by URL ascending. Records whose vector length differs from
    /// `embedding` are never returned.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>>;

    async fn count(&self) -> Result<usize>;

    /// Returns the number of records removed.
    async fn remove_host(&self, netloc: &str) -> Result<u64>;

    async fn hosts(&self) -> Result<Vec<String>>;
}

/// Score one stored vector against the query; `None` on a length mismatch.
pub(crate) fn score(query: &[f32], stored: &[f32]) -> Option<f32> {
    (query.len() == stored.len() && !query.is_empty()).then(|| cosine_similarity(query, stored))
}

/// Sort hits by score descending, then URL ascending, and keep the first `k`.
pub(crate) fn rank_hits(mut hits: Vec<IndexHit>, k: usize) -> Vec<IndexHit> {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.url.cmp(&b.url))
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str, score: f32) -> IndexHit {
        IndexHit {
            url: url.to_string(),
            text: String::new(),
            score,
        }
    }

    #[test]
    fn test_rank_hits_orders_and_truncates() {
        let ranked = rank_hits(
            vec![hit("c", 0.2), hit("b", 0.9), hit("a", 0.2), hit("d", 0.5)],
            3,
        );
        let urls: Vec<&str> = ranked.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "d", "a"]);
    }

    #[test]
    fn test_score_skips_dimension_mismatch() {
        assert!(score(&[1.0, 0.0], &[1.0, 0.0, 0.0]).is_none());
        assert!(score(&[], &[]).is_none());
        assert!(score(&[1.0, 0.0], &[1.0, 0.0]).is_some());
    }
}
