//! Conversation engine
//!
//! Drives one call through `NEW -> ACTIVE -> END_REQUESTED -> ENDED`.
//! Every failure below this boundary is recovered into a spoken reply;
//! the call never hangs silently.

use std::sync::Arc;

use salescall_core::{CallState, WorkerPool};
use salescall_llm::{LlmClient, PromptBuilder};
use salescall_rag::Retriever;

use crate::entities::{extract_from_utterance, parse_reply, sanitize_email};
use crate::session::CallSession;

/// Phrases that signal the caller wants to wrap up.
///
/// Matched as case-insensitive substrings of the utterance.
pub const END_CALL_PHRASES: &[&str] = &[
    "end call",
    "end the call",
    "goodbye",
    "good day",
    "bye",
    "quit",
    "stop",
    "hang up",
    "end conversation",
    "that's all",
    "thank you bye",
    "thanks bye",
    "stop the call",
    "leave me alone",
    "thank you",
];

const AFFIRMATIVE_TOKENS: &[&str] = &["yes", "okay"];

/// Fixed replies the engine falls back to without a model call
mod replies {
    pub const CLARIFY: &str = "I didn't catch that. Could you please repeat?";
    pub const CONFIRM_END: &str = "Would you like to end our conversation?";
    pub const FAREWELL: &str = "Thank you for your time. The call has ended.";
    pub const EMAIL_APOLOGY: &str =
        "Thank you for your time. However, there was an issue with the email provided.";
    pub const MODEL_APOLOGY: &str =
        "I apologize, but I'm having trouble processing that. Could you please repeat?";
    pub const FALLBACK_FAREWELL: &str = "Thank you for your time. Have a great day!";
    pub const RESUME: &str = "Alright, let's continue. What else can I help you with?";
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sampling temperature for replies
    pub temperature: f32,
    /// Token budget for replies
    pub max_tokens: u32,
    /// Knowledge chunks injected per turn
    pub retrieval_top_k: usize,
    /// Bounded pool size for model calls
    pub llm_pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 150,
            retrieval_top_k: 3,
            llm_pool_size: 10,
        }
    }
}

/// The engine's answer for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    /// Text to speak back to the caller
    pub text: String,
    /// True when the call should be hung up after this reply
    pub is_terminal: bool,
}

impl EngineReply {
    fn prompt(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_terminal: false,
        }
    }

    fn terminal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_terminal: true,
        }
    }
}

/// Per-call conversation state machine
pub struct ConversationEngine {
    llm: Arc<dyn LlmClient>,
    retriever: Arc<Retriever>,
    pool: WorkerPool,
    config: EngineConfig,
}

impl ConversationEngine {
    pub fn new(llm: Arc<dyn LlmClient>, retriever: Arc<Retriever>, config: EngineConfig) -> Self {
        Self {
            llm,
            retriever,
            pool: WorkerPool::new(config.llm_pool_size),
            config,
        }
    }

    /// Process one utterance for a session.
    ///
    /// Turns within a session must be serialized by the caller (the
    /// registry hands out the session behind an async lock); the next
    /// utterance races on the entity record otherwise.
    pub async fn handle_utterance(&self, session: &mut CallSession, input: &str) -> EngineReply {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return EngineReply::prompt(replies::CLARIFY);
        }

        if session.state() == CallState::Ended {
            return EngineReply::terminal(replies::FAREWELL);
        }

        if session.state() == CallState::EndRequested {
            let lower = trimmed.to_lowercase();

            if AFFIRMATIVE_TOKENS.iter().any(|t| lower.contains(t)) {
                return self.confirm_end(session);
            }

            if contains_negative_token(&lower) {
                // "no" cancels the end request; the rest of the
                // utterance continues the conversation
                tracing::debug!(call_id = %session.call_id(), "End request cancelled by caller");
                session.cancel_end_request();
                if strip_negative_prefix(trimmed).is_empty() {
                    return EngineReply::prompt(replies::RESUME);
                }
            } else {
                return EngineReply::prompt(replies::CONFIRM_END);
            }
        } else if is_end_call_phrase(trimmed) {
            tracing::info!(call_id = %session.call_id(), "End intent detected");
            session.request_end();
            return EngineReply::prompt(replies::CONFIRM_END);
        }

        self.normal_turn(session, trimmed).await
    }

    fn confirm_end(&self, session: &mut CallSession) -> EngineReply {
        session.confirm_end();

        let sanitized = session
            .entities()
            .email
            .as_deref()
            .and_then(sanitize_email);

        match sanitized {
            Some(email) => {
                session.set_email(email);
                EngineReply::terminal(replies::FAREWELL)
            }
            None => {
                tracing::warn!(
                    call_id = %session.call_id(),
                    "Invalid or missing email at confirmation; no booking will be made"
                );
                EngineReply::terminal(replies::EMAIL_APOLOGY)
            }
        }
    }

    async fn normal_turn(&self, session: &mut CallSession, input: &str) -> EngineReply {
        // Inline extraction keeps the snapshot shown to the model fresh
        let inline = extract_from_utterance(input);
        let mut snapshot = session.entities().clone();
        snapshot.merge(&inline);

        let context = self.retriever.retrieve(input, self.config.retrieval_top_k);
        if !context.is_empty() {
            tracing::debug!(
                call_id = %session.call_id(),
                chunks = context.len(),
                "Retrieved knowledge context"
            );
        }

        let messages = PromptBuilder::new()
            .system_text(session.system_prompt())
            .with_context(&context.context_text())
            .with_history(session.turns())
            .user_message_with_snapshot(input, &snapshot)
            .build();

        let llm = self.llm.clone();
        let temperature = self.config.temperature;
        let max_tokens = self.config.max_tokens;
        let outcome = self
            .pool
            .submit(async move { llm.complete(messages, temperature, max_tokens).await })
            .await;

        let raw = match outcome {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return self.model_failure(session, e.to_string()),
            Err(e) => return self.model_failure(session, e.to_string()),
        };

        let parsed = parse_reply(&raw);
        let spoken = parsed.spoken().to_string();

        // History and entities are only touched after a successful call
        session.push_user_turn(input);
        session.merge_entities(&inline);
        if let Some(delta) = parsed.entities() {
            session.record_extraction(&raw, delta.clone());
            session.merge_entities(delta);
        }
        session.push_assistant_turn(&spoken);

        EngineReply::prompt(spoken)
    }

    /// A model failure must still produce a spoken reply; session state
    /// stays untouched unless the end flow was already underway.
    fn model_failure(&self, session: &mut CallSession, error: String) -> EngineReply {
        tracing::error!(call_id = %session.call_id(), "Model request failed: {}", error);

        if session.end_call_detected() {
            session.mark_ended();
            return EngineReply::terminal(replies::FALLBACK_FAREWELL);
        }
        EngineReply::prompt(replies::MODEL_APOLOGY)
    }
}

fn is_end_call_phrase(text: &str) -> bool {
    let lower = text.to_lowercase();
    END_CALL_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn contains_negative_token(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .any(|token| matches!(token, "no" | "not" | "nope"))
}

/// Drop a leading "no"/"not really" style prefix so a bare refusal does
/// not get sent to the model as a turn.
fn strip_negative_prefix(text: &str) -> &str {
    const FILLERS: &[&str] = &["no", "not", "nope", "really", "thanks"];

    let mut rest = text.trim();
    loop {
        let token_end = rest
            .find(|c: char| !c.is_alphanumeric() && c != '\'')
            .unwrap_or(rest.len());
        let token = &rest[..token_end];
        if token.is_empty() || !FILLERS.iter().any(|f| token.eq_ignore_ascii_case(f)) {
            return rest;
        }
        rest = rest[token_end..].trim_start_matches([',', '.', '!', ' ']);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use salescall_llm::ScriptedLlm;
    use salescall_rag::{KnowledgeStore, Retriever, SimpleEmbedder};

    const SYSTEM_PROMPT: &str = "You are a sales agent.";

    fn engine_with(llm: Arc<ScriptedLlm>) -> ConversationEngine {
        let store = Arc::new(KnowledgeStore::new());
        let retriever = Arc::new(Retriever::new(store, Arc::new(SimpleEmbedder::default())));
        ConversationEngine::new(llm, retriever, EngineConfig::default())
    }

    fn entity_reply(spoken: &str, entities_json: &str) -> String {
        format!("{}\n[[ENTITIES]]\n{{\"entities\": {}}}\n[[END_ENTITIES]]", spoken, entities_json)
    }

    #[tokio::test]
    async fn test_empty_input_asks_for_repeat() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let engine = engine_with(llm.clone());
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        let reply = engine.handle_utterance(&mut session, "   ").await;
        assert_eq!(reply.text, replies::CLARIFY);
        assert!(!reply.is_terminal);
        assert_eq!(session.state(), CallState::New);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_goodbye_requests_confirmation() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let engine = engine_with(llm.clone());
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        let reply = engine.handle_utterance(&mut session, "okay goodbye then").await;
        assert_eq!(reply.text, replies::CONFIRM_END);
        assert!(!reply.is_terminal);
        assert_eq!(session.state(), CallState::EndRequested);
        assert!(session.end_call_detected());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_confirmed_end_with_valid_email() {
        let llm = Arc::new(ScriptedLlm::new(vec![&entity_reply(
            "Got it.",
            r#"{"email": "asha@example.com"}"#,
        )]));
        let engine = engine_with(llm);
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        engine
            .handle_utterance(&mut session, "my email is asha@example.com")
            .await;
        engine.handle_utterance(&mut session, "goodbye").await;
        let reply = engine.handle_utterance(&mut session, "yes").await;

        assert!(reply.is_terminal);
        assert_eq!(reply.text, replies::FAREWELL);
        assert_eq!(session.state(), CallState::Ended);
        assert!(session.end_call_confirmed());
    }

    #[tokio::test]
    async fn test_confirmed_end_without_email_apologizes() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let engine = engine_with(llm);
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        engine.handle_utterance(&mut session, "goodbye").await;
        let reply = engine.handle_utterance(&mut session, "yes").await;

        assert!(reply.is_terminal);
        assert_eq!(reply.text, replies::EMAIL_APOLOGY);
        assert_eq!(session.state(), CallState::Ended);
        assert!(session.entities().email.is_none());
    }

    #[tokio::test]
    async fn test_no_cancels_end_request() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let engine = engine_with(llm.clone());
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        engine.handle_utterance(&mut session, "goodbye").await;
        assert_eq!(session.state(), CallState::EndRequested);

        let reply = engine.handle_utterance(&mut session, "no").await;
        assert!(!reply.is_terminal);
        assert_eq!(reply.text, replies::RESUME);
        assert_eq!(session.state(), CallState::Active);
        assert!(!session.end_call_detected());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ambiguous_reply_reasks_confirmation() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let engine = engine_with(llm.clone());
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        engine.handle_utterance(&mut session, "goodbye").await;
        let reply = engine
            .handle_utterance(&mut session, "what about pricing")
            .await;

        assert_eq!(reply.text, replies::CONFIRM_END);
        assert_eq!(session.state(), CallState::EndRequested);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_normal_turn_merges_entities() {
        let llm = Arc::new(ScriptedLlm::new(vec![&entity_reply(
            "Nice to meet you, Asha. What does your company do?",
            r#"{"name": "Asha", "email": "asha@example.com", "company_name": null, "requirements": [], "meeting_date": null, "meeting_time": null, "industry": null}"#,
        )]));
        let engine = engine_with(llm);
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        let reply = engine
            .handle_utterance(&mut session, "my name is Asha, email asha@example.com")
            .await;

        assert_eq!(reply.text, "Nice to meet you, Asha. What does your company do?");
        assert!(!reply.is_terminal);
        assert_eq!(session.state(), CallState::Active);
        assert_eq!(session.entities().name.as_deref(), Some("Asha"));
        assert_eq!(session.entities().email.as_deref(), Some("asha@example.com"));
        assert_eq!(session.turn_count(), 2);
        assert_eq!(session.entity_audit().len(), 1);
    }

    #[tokio::test]
    async fn test_entities_survive_omitting_extraction() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            &entity_reply("Hello Asha.", r#"{"name": "Asha"}"#),
            &entity_reply("We build web portals.", r#"{"name": null, "email": null}"#),
        ]));
        let engine = engine_with(llm);
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        engine.handle_utterance(&mut session, "my name is Asha").await;
        engine.handle_utterance(&mut session, "what do you build?").await;

        // Nulls in the second extraction must not clear the name
        assert_eq!(session.entities().name.as_deref(), Some("Asha"));
    }

    #[tokio::test]
    async fn test_model_failure_preserves_session() {
        let llm = Arc::new(ScriptedLlm::failing(salescall_llm::LlmError::RateLimited));
        let engine = engine_with(llm);
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        let reply = engine.handle_utterance(&mut session, "tell me about pricing").await;

        assert_eq!(reply.text, replies::MODEL_APOLOGY);
        assert!(!reply.is_terminal);
        assert_eq!(session.state(), CallState::New);
        assert_eq!(session.turn_count(), 0);
        assert!(session.entity_audit().is_empty());
    }

    #[tokio::test]
    async fn test_unparsed_reply_keeps_spoken_text() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            "Sure, we can help with that. [[ENTITIES]] {broken json [[END_ENTITIES]]",
        ]));
        let engine = engine_with(llm);
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        let reply = engine.handle_utterance(&mut session, "can you help?").await;

        assert_eq!(reply.text, "Sure, we can help with that.");
        assert_eq!(session.turn_count(), 2);
        assert!(session.entity_audit().is_empty());
    }

    #[tokio::test]
    async fn test_utterance_after_end_is_terminal() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let engine = engine_with(llm);
        let mut session = CallSession::new("CA1", SYSTEM_PROMPT);

        engine.handle_utterance(&mut session, "goodbye").await;
        engine.handle_utterance(&mut session, "yes").await;
        let reply = engine.handle_utterance(&mut session, "hello?").await;

        assert!(reply.is_terminal);
        assert_eq!(session.state(), CallState::Ended);
    }
}
