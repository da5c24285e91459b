//! External action collaborators
//!
//! Abstract contracts for the calendar and CRM systems invoked at call
//! end. Real clients (Google Calendar, Salesforce, ...) live outside
//! this workspace; stubs here cover development and tests.

pub mod stub;

pub use stub::{RecordingCalendar, RecordingCrm, StubCalendarIntegration, StubCrmIntegration};

use async_trait::async_trait;
use thiserror::Error;

use salescall_core::LeadEntities;

/// Integration errors
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("CRM error: {0}")]
    Crm(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

impl From<IntegrationError> for salescall_core::Error {
    fn from(err: IntegrationError) -> Self {
        salescall_core::Error::Integration(err.to_string())
    }
}

/// A created calendar event
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    /// Link to the event, when the provider returns one
    pub link: Option<String>,
    /// Provider event id
    pub event_id: Option<String>,
}

/// Calendar collaborator contract
#[async_trait]
pub trait CalendarIntegration: Send + Sync {
    /// Create a consultation event from the captured entities.
    async fn create_event(&self, entities: &LeadEntities) -> Result<CalendarEvent, IntegrationError>;
}

/// CRM collaborator contract
#[async_trait]
pub trait CrmIntegration: Send + Sync {
    /// Create a lead from the captured entities; `false` means the
    /// provider accepted the request but rejected the lead.
    async fn create_lead(&self, entities: &LeadEntities) -> Result<bool, IntegrationError>;
}
