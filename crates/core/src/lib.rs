//! Core types for the sales call engine
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation turns and call state
//! - The lead entity record and its merge rules
//! - Inbound/outbound event shapes
//! - The bounded worker pool
//! - Error types

pub mod conversation;
pub mod error;
pub mod events;
pub mod lead;
pub mod pool;

pub use conversation::{CallOutcome, CallState, CallSummary, SummaryResult, SummaryStatus, Turn, TurnRole};
pub use error::{Error, Result};
pub use events::{CallEndStatus, InboundEvent, OutboundEvent};
pub use lead::{LeadDelta, LeadEntities};
pub use pool::WorkerPool;
