//! Knowledge base storage
//!
//! Four parallel arrays describe the ingested chunks; index `i` across
//! all of them is one chunk. Updates always swap the whole object so a
//! reader holds either the old base or the new one, never a mix.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::embeddings::Embedder;
use crate::RagError;

/// Immutable snapshot of ingested reference chunks
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    chunks: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    sources: Vec<String>,
    page_numbers: Vec<u32>,
}

impl KnowledgeBase {
    /// Build from parallel arrays, enforcing equal lengths.
    pub fn new(
        chunks: Vec<String>,
        embeddings: Vec<Vec<f32>>,
        sources: Vec<String>,
        page_numbers: Vec<u32>,
    ) -> Result<Self, RagError> {
        let n = chunks.len();
        if embeddings.len() != n || sources.len() != n || page_numbers.len() != n {
            return Err(RagError::Knowledge(format!(
                "parallel array length mismatch: {} chunks, {} embeddings, {} sources, {} pages",
                n,
                embeddings.len(),
                sources.len(),
                page_numbers.len()
            )));
        }

        Ok(Self {
            chunks,
            embeddings,
            sources,
            page_numbers,
        })
    }

    /// Build from raw chunks, embedding each with the collaborator.
    pub fn from_chunks(chunks: Vec<String>, source_label: &str, embedder: &dyn Embedder) -> Self {
        let embeddings = chunks.iter().map(|c| embedder.encode(c)).collect();
        let n = chunks.len();
        Self {
            embeddings,
            sources: vec![source_label.to_string(); n],
            page_numbers: vec![1; n],
            chunks,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    /// One chunk's row: (text, embedding, source, page)
    pub fn row(&self, i: usize) -> Option<(&str, &[f32], &str, u32)> {
        Some((
            self.chunks.get(i)?.as_str(),
            self.embeddings.get(i)?.as_slice(),
            self.sources.get(i)?.as_str(),
            *self.page_numbers.get(i)?,
        ))
    }
}

/// Process-wide holder of the current knowledge base.
///
/// Readers take an `Arc` snapshot; ingestion replaces the `Arc` under a
/// short write lock. No in-place mutation.
#[derive(Default)]
pub struct KnowledgeStore {
    current: RwLock<Arc<KnowledgeBase>>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current base; valid for the reader's whole retrieval pass even
    /// if an ingestion swap lands mid-way.
    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        self.current.read().clone()
    }

    /// Replace the base wholesale.
    pub fn replace(&self, base: KnowledgeBase) {
        let count = base.len();
        *self.current.write() = Arc::new(base);
        tracing::info!(chunks = count, "Knowledge base replaced");
    }

    /// Swap in a new base holding the old rows plus the new ones.
    pub fn extend(&self, base: KnowledgeBase) -> Result<(), RagError> {
        let old = self.snapshot();

        let mut chunks = old.chunks.clone();
        let mut embeddings = old.embeddings.clone();
        let mut sources = old.sources.clone();
        let mut page_numbers = old.page_numbers.clone();

        chunks.extend(base.chunks);
        embeddings.extend(base.embeddings);
        sources.extend(base.sources);
        page_numbers.extend(base.page_numbers);

        let merged = KnowledgeBase::new(chunks, embeddings, sources, page_numbers)?;
        let count = merged.len();
        *self.current.write() = Arc::new(merged);
        tracing::info!(chunks = count, "Knowledge base extended");
        Ok(())
    }
}

/// Pack sentences into chunks of roughly `chunk_size` characters.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut current_len = 0;

    for sentence in text.split(". ") {
        let sentence = format!("{}. ", sentence.trim());
        let sentence_len = sentence.len();

        if current_len + sentence_len > chunk_size && !current.is_empty() {
            chunks.push(current.join(" "));
            current = vec![sentence];
            current_len = sentence_len;
        } else {
            current.push(sentence);
            current_len += sentence_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks.retain(|c| !c.trim().trim_matches('.').trim().is_empty());
    chunks
}
