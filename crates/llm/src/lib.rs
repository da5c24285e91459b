//! LLM collaborator interface and prompt construction
//!
//! Features:
//! - Chat message model
//! - `LlmClient` collaborator trait (implemented elsewhere)
//! - Sales prompt builder with entity echo instructions
//! - Scripted client for tests

pub mod client;
pub mod prompt;

pub use client::{LlmClient, ScriptedLlm};
pub use prompt::{sales_system_prompt, Message, PromptBuilder, Role, ENTITIES_CLOSE_TAG, ENTITIES_OPEN_TAG};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,
}

impl From<LlmError> for salescall_core::Error {
    fn from(err: LlmError) -> Self {
        salescall_core::Error::Llm(err.to_string())
    }
}
