//! Transport event shapes
//!
//! The shapes a transport delivers to the core and receives back. The
//! transport mechanics themselves (HTTP, WebSocket, telephony webhooks)
//! live outside this workspace; these types are the seam.

use serde::{Deserialize, Serialize};

/// Inbound events consumed by the event router
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A call was connected
    CallStart { call_id: String },
    /// A recognized utterance for an active call
    Utterance {
        call_id: String,
        transcript_text: String,
    },
    /// A streamed audio frame, base64-encoded payload
    AudioFrame {
        call_id: String,
        audio_bytes_base64: String,
    },
    /// The call ended; triggers summary and lifecycle actions
    CallEnd { call_id: String },
    /// Replace the knowledge base with new reference chunks
    KnowledgeIngest {
        chunks: Vec<String>,
        source_label: String,
    },
}

impl InboundEvent {
    /// Call id this event addresses, if any
    pub fn call_id(&self) -> Option<&str> {
        match self {
            InboundEvent::CallStart { call_id }
            | InboundEvent::Utterance { call_id, .. }
            | InboundEvent::AudioFrame { call_id, .. }
            | InboundEvent::CallEnd { call_id } => Some(call_id),
            InboundEvent::KnowledgeIngest { .. } => None,
        }
    }
}

/// Status reported to the call-end caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallEndStatus {
    Success,
    Pending,
    Error,
}

/// Outbound events produced for the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Spoken reply for the caller
    Reply {
        call_id: String,
        text: String,
        is_terminal: bool,
    },
    /// End-of-call report with the cached summary
    CallEnded {
        call_id: String,
        status: CallEndStatus,
        summary: String,
    },
}
