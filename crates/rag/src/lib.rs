//! Knowledge retrieval for context injection
//!
//! Features:
//! - In-memory knowledge base of chunk/embedding/source/page rows
//! - Whole-object store swap so readers never see a half-updated base
//! - Cosine-similarity retrieval with stable tie-breaking
//! - Sentence-packing chunker for ingested reference text

pub mod embeddings;
pub mod knowledge;
pub mod retriever;

pub use embeddings::{cosine_similarity, Embedder, SimpleEmbedder};
pub use knowledge::{chunk_text, KnowledgeBase, KnowledgeStore};
pub use retriever::{RetrievalResult, Retriever};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(String),
}

impl From<RagError> for salescall_core::Error {
    fn from(err: RagError) -> Self {
        salescall_core::Error::Retrieval(err.to_string())
    }
}
