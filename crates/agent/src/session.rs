//! Per-call session record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salescall_core::{CallState, CallSummary, LeadDelta, LeadEntities, Turn, TurnRole};

/// One entry in the extraction audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub timestamp: DateTime<Utc>,
    /// Raw model output the entities were parsed from
    pub raw_output: String,
    /// The parsed delta
    pub parsed: LeadDelta,
    /// Entity record state before this delta was merged
    pub entities_before: LeadEntities,
}

/// The mutable per-call record of history, entities, and state.
///
/// Owned exclusively by the session registry; callers reach it through
/// the registry's per-session lock, which serializes turns.
#[derive(Debug)]
pub struct CallSession {
    call_id: String,
    history: Vec<Turn>,
    pub(crate) entities: LeadEntities,
    state: CallState,
    end_call_detected: bool,
    end_call_confirmed: bool,
    summary: Option<CallSummary>,
    extraction_audit: Vec<ExtractionRecord>,
}

impl CallSession {
    /// Create a fresh session seeded with the fixed system prompt.
    pub fn new(call_id: impl Into<String>, system_prompt: &str) -> Self {
        Self {
            call_id: call_id.into(),
            history: vec![Turn::system(system_prompt)],
            entities: LeadEntities::default(),
            state: CallState::New,
            end_call_detected: false,
            end_call_confirmed: false,
            summary: None,
            extraction_audit: Vec::new(),
        }
    }

    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn entities(&self) -> &LeadEntities {
        &self.entities
    }

    /// All turns, the seeded system turn first.
    pub fn turns(&self) -> &[Turn] {
        &self.history
    }

    /// User and assistant turns only.
    pub fn turn_count(&self) -> usize {
        self.history.iter().filter(|t| !t.is_system()).count()
    }

    /// The system prompt this session was seeded with.
    pub fn system_prompt(&self) -> &str {
        self.history
            .first()
            .filter(|t| t.is_system())
            .map(|t| t.text.as_str())
            .unwrap_or_default()
    }

    pub fn end_call_detected(&self) -> bool {
        self.end_call_detected
    }

    pub fn end_call_confirmed(&self) -> bool {
        self.end_call_confirmed
    }

    pub fn summary(&self) -> Option<&CallSummary> {
        self.summary.as_ref()
    }

    /// Extraction audit trail, oldest first.
    pub fn entity_audit(&self) -> &[ExtractionRecord] {
        &self.extraction_audit
    }

    pub(crate) fn push_user_turn(&mut self, text: &str) {
        self.history.push(Turn::user(text));
    }

    /// Appending the assistant turn is what moves a new session into
    /// the active state.
    pub(crate) fn push_assistant_turn(&mut self, text: &str) {
        self.history.push(Turn::assistant(text));
        if self.state == CallState::New {
            self.state = CallState::Active;
        }
    }

    pub(crate) fn merge_entities(&mut self, delta: &LeadDelta) {
        self.entities.merge(delta);
    }

    pub(crate) fn set_email(&mut self, email: String) {
        self.entities.email = Some(email);
    }

    pub(crate) fn record_extraction(&mut self, raw_output: &str, parsed: LeadDelta) {
        self.extraction_audit.push(ExtractionRecord {
            timestamp: Utc::now(),
            raw_output: raw_output.to_string(),
            parsed,
            entities_before: self.entities.clone(),
        });
    }

    pub(crate) fn request_end(&mut self) {
        self.end_call_detected = true;
        if self.state != CallState::Ended {
            self.state = CallState::EndRequested;
        }
    }

    pub(crate) fn cancel_end_request(&mut self) {
        self.end_call_detected = false;
        self.state = CallState::Active;
    }

    pub(crate) fn confirm_end(&mut self) {
        self.end_call_confirmed = true;
        self.state = CallState::Ended;
    }

    pub(crate) fn mark_ended(&mut self) {
        self.state = CallState::Ended;
    }

    /// Cache the summary; only the first write sticks.
    pub(crate) fn cache_summary(&mut self, summary: CallSummary) {
        if self.summary.is_none() {
            self.summary = Some(summary);
        }
    }

    /// Non-system turns rendered as `User:`/`AI:` lines for the
    /// summary prompt.
    pub fn formatted_transcript(&self) -> String {
        self.history
            .iter()
            .filter(|t| !t.is_system())
            .map(|t| match t.role {
                TurnRole::User => format!("User: {}", t.text),
                _ => format!("AI: {}", t.text),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salescall_core::CallOutcome;

    #[test]
    fn test_new_session_seeded() {
        let session = CallSession::new("CA1", "You are a sales agent.");
        assert_eq!(session.call_id(), "CA1");
        assert_eq!(session.state(), CallState::New);
        assert_eq!(session.turns().len(), 1);
        assert_eq!(session.system_prompt(), "You are a sales agent.");
        assert_eq!(session.turn_count(), 0);
    }

    #[test]
    fn test_first_assistant_turn_activates() {
        let mut session = CallSession::new("CA1", "prompt");
        session.push_user_turn("hello");
        assert_eq!(session.state(), CallState::New);

        session.push_assistant_turn("hi, how can I help?");
        assert_eq!(session.state(), CallState::Active);
        assert_eq!(session.turn_count(), 2);
    }

    #[test]
    fn test_summary_written_once() {
        let mut session = CallSession::new("CA1", "prompt");
        session.cache_summary(CallSummary {
            text: "first".into(),
            outcome: CallOutcome::FollowUp,
        });
        session.cache_summary(CallSummary {
            text: "second".into(),
            outcome: CallOutcome::Rejected,
        });

        let summary = session.summary().unwrap();
        assert_eq!(summary.text, "first");
        assert_eq!(summary.outcome, CallOutcome::FollowUp);
    }

    #[test]
    fn test_formatted_transcript_skips_system() {
        let mut session = CallSession::new("CA1", "prompt");
        session.push_user_turn("I need an app");
        session.push_assistant_turn("Tell me more.");

        let transcript = session.formatted_transcript();
        assert_eq!(transcript, "User: I need an app\nAI: Tell me more.");
    }

    #[test]
    fn test_audit_captures_prior_state() {
        let mut session = CallSession::new("CA1", "prompt");
        session.merge_entities(&LeadDelta {
            name: Some("Asha".into()),
            ..Default::default()
        });
        session.record_extraction(
            "raw model output",
            LeadDelta {
                email: Some("asha@example.com".into()),
                ..Default::default()
            },
        );

        let record = &session.entity_audit()[0];
        assert_eq!(record.entities_before.name.as_deref(), Some("Asha"));
        assert!(record.entities_before.email.is_none());
        assert_eq!(record.parsed.email.as_deref(), Some("asha@example.com"));
    }
}
