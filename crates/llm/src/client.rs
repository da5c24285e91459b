//! LLM collaborator contract

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::prompt::Message;
use crate::LlmError;

/// Completion client the engine depends on.
///
/// Concrete transports (OpenAI-compatible HTTP, local inference, ...)
/// are wired in by the embedding application.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the given messages.
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

/// Scripted client that pops canned responses in order.
///
/// Used by tests and local development; once the script is exhausted it
/// fails like a transport error would.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.to_string())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose next call fails with the given error
    pub fn failing(error: LlmError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(error)])),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Append another scripted response
    pub fn push(&self, response: &str) {
        self.responses.lock().push_back(Ok(response.to_string()));
    }

    /// Message lists seen so far, in call order
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.calls.lock().push(messages);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Request("script exhausted".to_string())))
    }
}
