//! Session registry and transport seam
//!
//! Owns one conversation session per call id and routes the typed
//! transport events into the engine, pipeline, and lifecycle. The
//! actual HTTP/WebSocket transport lives outside this workspace and
//! calls into [`EventRouter`].

pub mod events;
pub mod session;
pub mod state;

pub use events::EventRouter;
pub use session::{CallSessionHandle, SessionRegistry};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for salescall_core::Error {
    fn from(err: ServerError) -> Self {
        salescall_core::Error::Session(err.to_string())
    }
}
