//! End-of-call summary generation

use std::sync::Arc;

use salescall_core::{CallOutcome, CallSummary, SummaryResult, SummaryStatus, WorkerPool};
use salescall_llm::{LlmClient, Message};

use crate::session::CallSession;
use crate::AgentError;

const SUMMARY_SYSTEM_PROMPT: &str = r#"Please analyze this sales conversation and provide a concise summary including:
1. Customer's main interests and concerns
2. Any commitments or next steps
3. Important details captured (contact info, requirements, etc.)

If you did not receive a conversation to analyze, respond with "No conversation found to summarize."

Additionally, based on the conversation, classify the outcome with one of the following labels:
- Converted: the customer successfully scheduled a meeting.
- Follow Up: the customer is interested but requests another time to connect.
- Rejected: the customer is not interested, declines the offer, or the conversation is missing.

At the end of the summary, explicitly mention the classification in the format: Outcome: [Converted/Follow Up/Rejected]"#;

const NO_SUMMARY_TEXT: &str = "No summary available.";

/// Summary configuration
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 150,
        }
    }
}

/// Produces and caches the end-of-call narrative summary.
pub struct SummaryGenerator {
    llm: Arc<dyn LlmClient>,
    pool: WorkerPool,
    config: SummaryConfig,
}

impl SummaryGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, pool: WorkerPool, config: SummaryConfig) -> Self {
        Self { llm, pool, config }
    }

    /// Generate the summary for a session, caching it on first success.
    ///
    /// A second call returns the cached summary without touching the
    /// model. An empty history still produces a Rejected-leaning
    /// summary.
    pub async fn generate(&self, session: &mut CallSession) -> Result<CallSummary, AgentError> {
        if let Some(existing) = session.summary() {
            return Ok(existing.clone());
        }

        let transcript = session.formatted_transcript();
        let messages = vec![
            Message::system(SUMMARY_SYSTEM_PROMPT),
            Message::user(format!(
                "Here's the conversation to summarize:\n\n{}",
                transcript
            )),
        ];

        let llm = self.llm.clone();
        let temperature = self.config.temperature;
        let max_tokens = self.config.max_tokens;
        let outcome = self
            .pool
            .submit(async move { llm.complete(messages, temperature, max_tokens).await })
            .await;

        match outcome {
            Ok(Ok(text)) => {
                let outcome = CallOutcome::from_summary(&text).unwrap_or(CallOutcome::Rejected);
                let summary = CallSummary { text, outcome };
                session.cache_summary(summary.clone());
                tracing::info!(
                    call_id = %session.call_id(),
                    outcome = outcome.display_name(),
                    "Summary generated"
                );
                Ok(summary)
            }
            Ok(Err(e)) => {
                tracing::error!(call_id = %session.call_id(), "Summary generation failed: {}", e);
                session.cache_summary(CallSummary {
                    text: "Error generating summary".to_string(),
                    outcome: CallOutcome::Rejected,
                });
                Err(AgentError::Summary(e.to_string()))
            }
            Err(e) => {
                tracing::error!(call_id = %session.call_id(), "Summary generation failed: {}", e);
                session.cache_summary(CallSummary {
                    text: "Error generating summary".to_string(),
                    outcome: CallOutcome::Rejected,
                });
                Err(AgentError::Summary(e.to_string()))
            }
        }
    }

    /// Pure read of the cached summary state; never regenerates.
    pub fn latest(&self, session: &CallSession) -> SummaryResult {
        match session.summary() {
            Some(summary) => SummaryResult {
                status: SummaryStatus::Success,
                summary: summary.text.clone(),
            },
            None => SummaryResult {
                status: SummaryStatus::Pending,
                summary: NO_SUMMARY_TEXT.to_string(),
            },
        }
    }
}
