//! In-memory [`VectorIndex`] implementation for tests.
//!
//! Records live in a `BTreeMap` keyed by URL behind a `std::sync::RwLock`.
//! Search is brute-force cosine similarity over every stored vector.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use url::Url;

use crate::models::{IndexHit, PageRecord};
use crate::urls::netloc;

use super::{rank_hits, score, VectorIndex};

#[derive(Default)]
pub struct InMemoryIndex {
    records: RwLock<BTreeMap<String, PageRecord>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the record stored under `url`.
    pub fn get(&self, url: &str) -> Option<PageRecord> {
        self.records.read().ok()?.get(url).cloned()
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(netloc)
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory index lock poisoned")
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, record: &PageRecord) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.insert(record.url.clone(), record.clone());
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<IndexHit>> {
        let records = self.records.read().map_err(poisoned)?;
        let hits = records
            .values()
            .filter_map(|r| {
                score(embedding, &r.embedding).map(|score| IndexHit {
                    url: r.url.clone(),
                    text: r.text.clone(),
                    score,
                })
            })
            .collect();
        Ok(rank_hits(hits, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }

    async fn remove_host(&self, host: &str) -> Result<u64> {
        let mut records = self.records.write().map_err(poisoned)?;
        let before = records.len();
        records.retain(|url, _| host_of(url).as_deref() != Some(host));
        Ok((before - records.len()) as u64)
    }

    async fn hosts(&self) -> Result<Vec<String>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut hosts: Vec<String> = records.keys().filter_map(|u| host_of(u)).collect();
        hosts.sort();
        hosts.dedup();
        Ok(hosts)
    }
}
