//! Conversation turns, call state, and end-of-call summary types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    System,
    User,
    Assistant,
}

/// A single conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(TurnRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, text)
    }

    fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Is this the seeded system turn?
    pub fn is_system(&self) -> bool {
        self.role == TurnRole::System
    }
}

/// Per-call conversation state
///
/// `New` is entered on session creation, `Active` after the first
/// assistant turn. An end-intent phrase moves the call to
/// `EndRequested`; confirmation moves it to `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    #[default]
    New,
    Active,
    EndRequested,
    Ended,
}

impl CallState {
    pub fn is_ended(&self) -> bool {
        *self == CallState::Ended
    }
}

/// Lead disposition at the end of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    /// Customer scheduled a meeting
    Converted,
    /// Customer interested, asked to connect later
    FollowUp,
    /// Customer declined, or no conversation took place
    Rejected,
}

impl CallOutcome {
    pub fn display_name(&self) -> &'static str {
        match self {
            CallOutcome::Converted => "Converted",
            CallOutcome::FollowUp => "Follow Up",
            CallOutcome::Rejected => "Rejected",
        }
    }

    /// Parse the outcome label from a summary's trailing
    /// `Outcome: [...]` marker.
    pub fn from_summary(text: &str) -> Option<Self> {
        let idx = text.rfind("Outcome:")?;
        let tail = text[idx..].to_lowercase();
        if tail.contains("converted") {
            Some(CallOutcome::Converted)
        } else if tail.contains("follow") {
            Some(CallOutcome::FollowUp)
        } else if tail.contains("rejected") {
            Some(CallOutcome::Rejected)
        } else {
            None
        }
    }
}

/// Cached end-of-call summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    /// Narrative summary text from the model
    pub text: String,
    /// Outcome classification parsed from the summary
    pub outcome: CallOutcome,
}

/// Status of the cached summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Pending,
    Success,
}

/// Read-only view of the cached summary state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    pub status: SummaryStatus,
    pub summary: String,
}
