//! Conversational sales agent
//!
//! Features:
//! - Per-call conversation state machine with end-of-call confirmation
//! - Sentinel-block entity extraction with monotonic merge
//! - Inline utterance extraction (name, email, date, time)
//! - End-of-call summary with outcome classification
//! - Lifecycle coordination of best-effort external actions

pub mod conversation;
pub mod entities;
pub mod lifecycle;
pub mod session;
pub mod summary;

pub use conversation::{ConversationEngine, EngineConfig, EngineReply, END_CALL_PHRASES};
pub use entities::{extract_from_utterance, parse_reply, sanitize_email, ParsedReply};
pub use lifecycle::{CallEndReport, LifecycleCoordinator};
pub use session::{CallSession, ExtractionRecord};
pub use summary::{SummaryConfig, SummaryGenerator};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Conversation error: {0}")]
    Conversation(String),

    #[error("Entity parse error: {0}")]
    EntityParse(String),

    #[error("Summary error: {0}")]
    Summary(String),

    #[error("LLM error: {0}")]
    Llm(String),
}

impl From<salescall_llm::LlmError> for AgentError {
    fn from(err: salescall_llm::LlmError) -> Self {
        AgentError::Llm(err.to_string())
    }
}

impl From<AgentError> for salescall_core::Error {
    fn from(err: AgentError) -> Self {
        salescall_core::Error::Conversation(err.to_string())
    }
}
