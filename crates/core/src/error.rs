//! Shared error type

use thiserror::Error;

/// Top-level error for the sales call engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Conversation error: {0}")]
    Conversation(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Worker pool error: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, Error>;
