//! SQLite-backed [`VectorIndex`] implementation.
//!
//! One row per page in the `pages` table (see [`migrate`](crate::migrate)).
//! Vectors are stored as little-endian f32 BLOBs; k-NN loads every vector
//! and scores it with cosine similarity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use url::Url;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{IndexHit, PageRecord};
use crate::store::{rank_hits, score, VectorIndex};
use crate::urls::netloc;

/// Durable vector index over a [`SqlitePool`].
///
/// Each row also records the embedding model name and dimensionality that
/// produced its vector, a SHA-256 hash of the text, and the time it was
/// written.
pub struct SqliteIndex {
    pool: SqlitePool,
    model: String,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, model: impl Into<String>) -> Self {
        Self {
            pool,
            model: model.into(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, record: &PageRecord) -> Result<()> {
        let url = Url::parse(&record.url)
            .with_context(|| format!("invalid page URL: {}", record.url))?;
        let host = netloc(&url).unwrap_or_default();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO pages (url, host, text, embedding, model, dims, content_hash, indexed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(url) DO UPDATE SET
                host = excluded.host,
                text = excluded.text,
                embedding = excluded.embedding,
                model = excluded.model,
                dims = excluded.dims,
                content_hash = excluded.content_hash,
                indexed_at = excluded.indexed_at
            "#,
        )
        .bind(&record.url)
        .bind(&host)
        .bind(&record.text)
        .bind(vec_to_blob(&record.embedding))
        .bind(&self.model)
        .bind(record.embedding.len() as i64)
        .bind(content_hash(&record.text))
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert {}", record.url))?;

        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let rows = sqlx::query("SELECT url, text, embedding FROM pages WHERE dims = ?")
            .bind(embedding.len() as i64)
            .fetch_all(&self.pool)
            .await?;

        let hits = rows
            .iter()
            .filter_map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                score(embedding, &blob_to_vec(&blob)).map(|score| IndexHit {
                    url: row.get("url"),
                    text: row.get("text"),
                    score,
                })
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn remove_host(&self, host: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pages WHERE host = ?")
            .bind(host)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn hosts(&self) -> Result<Vec<String>> {
        let hosts: Vec<String> = sqlx::query_scalar("SELECT DISTINCT host FROM pages ORDER BY host")
            .fetch_all(&self.pool)
            .await?;
        Ok(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> SqliteIndex {
        let pool = db::connect_path(&dir.path().join("data/site.sqlite"))
            .await
            .unwrap();
        migrate::apply(&pool).await.unwrap();
        SqliteIndex::new(pool, "fake-model")
    }

    fn record(url: &str, text: &str, embedding: Vec<f32>) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            text: text.to_string(),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_upsert_same_key_twice_keeps_one_row() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir).await;
        let r = record("http://example.test/", "home page", vec![1.0, 0.0, 0.0]);
        index.upsert(&r).await.unwrap();
        index.upsert(&r).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);

        let row = sqlx::query("SELECT host, model, dims, content_hash FROM pages")
            .fetch_one(index.pool())
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("host"), "example.test");
        assert_eq!(row.get::<String, _>("model"), "fake-model");
        assert_eq!(row.get::<i64, _>("dims"), 3);
        assert_eq!(row.get::<String, _>("content_hash").len(), 64);
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity_then_url() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir).await;
        index
            .upsert(&record("http://example.test/b", "b", vec![1.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(&record("http://example.test/a", "a", vec![1.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(&record("http://example.test/c", "c", vec![0.0, 1.0]))
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 3).await.unwrap();
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://example.test/a",
                "http://example.test/b",
                "http://example.test/c"
            ]
        );
        assert_eq!(hits[0].text, "a");
    }

    #[tokio::test]
    async fn test_query_skips_other_dimensionality() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir).await;
        index
            .upsert(&record("http://example.test/old", "old", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        assert!(index.query(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let index = open(&dir).await;
            index
                .upsert(&record("http://example.test/", "kept", vec![0.5, 0.5]))
                .await
                .unwrap();
            index.pool().close().await;
        }
        let index = open(&dir).await;
        let hits = index.query(&[0.5, 0.5], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "kept");
    }

    #[tokio::test]
    async fn test_remove_host() {
        let dir = TempDir::new().unwrap();
        let index = open(&dir).await;
        for url in ["http://example.test/", "http://example.test/x", "http://other.test/"] {
            index.upsert(&record(url, "t", vec![1.0])).await.unwrap();
        }
        assert_eq!(index.hosts().await.unwrap(), vec!["example.test", "other.test"]);
        assert_eq!(index.remove_host("example.test").await.unwrap(), 2);
        assert_eq!(index.hosts().await.unwrap(), vec!["other.test"]);
    }
}
