//! Similarity retrieval over the knowledge base

use std::sync::Arc;

use crate::embeddings::{cosine_similarity, Embedder};
use crate::knowledge::KnowledgeStore;

/// Ranked retrieval output; all four arrays are the same length.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub chunks: Vec<String>,
    pub similarities: Vec<f32>,
    pub sources: Vec<String>,
    pub page_numbers: Vec<u32>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks joined for prompt injection
    pub fn context_text(&self) -> String {
        self.chunks.join("\n")
    }
}

/// Ranks knowledge chunks against a query by cosine similarity.
pub struct Retriever {
    store: Arc<KnowledgeStore>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(store: Arc<KnowledgeStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Top-`k` chunks in strictly descending similarity order; equal
    /// scores keep their original chunk index order. Never errors; an
    /// empty base yields an empty result.
    pub fn retrieve(&self, query: &str, k: usize) -> RetrievalResult {
        let base = self.store.snapshot();
        if base.is_empty() || k == 0 {
            return RetrievalResult::empty();
        }

        let query_embedding = self.embedder.encode(query);

        let mut scored: Vec<(usize, f32)> = base
            .embeddings()
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(&query_embedding, e)))
            .collect();

        // Stable sort keeps index order for equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let mut result = RetrievalResult::default();
        for (i, score) in scored {
            if let Some((chunk, _, source, page)) = base.row(i) {
                result.chunks.push(chunk.to_string());
                result.similarities.push(score);
                result.sources.push(source.to_string());
                result.page_numbers.push(page);
            }
        }

        result
    }
}
