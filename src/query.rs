//! Question answering over the vector index.
//!
//! [`QueryEngine::ask`] embeds the question with the same provider used at
//! crawl time, runs a k-NN query and turns each hit into a compact snippet.
//! It never fails: an empty index yields no hits, and an embedding or index
//! error is carried in [`AskOutcome::error`] next to an empty hit list.

use std::sync::Arc;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::models::QueryHit;
use crate::store::VectorIndex;

pub const DEFAULT_SNIPPET_CHARS: usize = 500;

/// Result of one [`QueryEngine::ask`] call.
#[derive(Debug, Clone, Default)]
pub struct AskOutcome {
    pub hits: Vec<QueryHit>,
    pub error: Option<String>,
}

impl AskOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            hits: Vec::new(),
            error: Some(message.into()),
        }
    }
}

pub struct QueryEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    snippet_chars: usize,
}

impl QueryEngine {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            snippet_chars: DEFAULT_SNIPPET_CHARS,
        }
    }

    pub fn with_snippet_chars(mut self, snippet_chars: usize) -> Self {
        self.snippet_chars = snippet_chars.max(1);
        self
    }

    pub async fn ask(&self, question: &str, top_k: usize) -> AskOutcome {
        let question = question.trim();
        if question.is_empty() {
            return AskOutcome::failed("question must not be empty");
        }
        if top_k == 0 {
            return AskOutcome::failed("top_k must be >= 1");
        }

        let embedding = match embed_query(self.embedder.as_ref(), question).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to embed question");
                return AskOutcome::failed(e.to_string());
            }
        };

        let hits = match self.index.query(&embedding, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "index query failed");
                return AskOutcome::failed(e.to_string());
            }
        };

        tracing::debug!(top_k, hits = hits.len(), "query answered");

        AskOutcome {
            hits: hits
                .into_iter()
                .enumerate()
                .map(|(i, hit)| QueryHit {
                    rank: i + 1,
                    snippet: snippet(&hit.text, self.snippet_chars),
                    url: hit.url,
                    score: hit.score,
                })
                .collect(),
            error: None,
        }
    }
}

/// First `max_chars` characters of `text` with line breaks turned into spaces.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// Render an outcome the way `ask_site` reports it to callers.
///
/// ```text
/// [Result 1] http://example.test/
/// Welcome to the example site...
///
/// [Result 2] http://example.test/about
/// About us...
/// ```
pub fn format_answer(outcome: &AskOutcome) -> String {
    if let Some(error) = &outcome.error {
        return format!("Error querying site: {}", error);
    }
    if outcome.hits.is_empty() {
        return "No relevant content found.".to_string();
    }
    outcome
        .hits
        .iter()
        .map(|hit| format!("[Result {}] {}\n{}...\n", hit.rank, hit.url, hit.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}
