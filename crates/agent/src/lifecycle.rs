//! End-of-call lifecycle coordination
//!
//! The summary is generated and cached no matter what. External actions
//! only fire when every required entity is present and the email passes
//! sanitization; the two actions run concurrently and fail
//! independently.

use std::sync::Arc;

use salescall_core::{CallEndStatus, CallOutcome, CallSummary};
use salescall_integrations::{CalendarIntegration, CrmIntegration};

use crate::entities::sanitize_email;
use crate::session::CallSession;
use crate::summary::SummaryGenerator;

/// What the call-end caller gets back
#[derive(Debug, Clone)]
pub struct CallEndReport {
    pub status: CallEndStatus,
    pub summary: String,
    pub outcome: CallOutcome,
}

/// Coordinates summary and best-effort external actions at call end.
pub struct LifecycleCoordinator {
    summarizer: SummaryGenerator,
    calendar: Arc<dyn CalendarIntegration>,
    crm: Arc<dyn CrmIntegration>,
}

impl LifecycleCoordinator {
    pub fn new(
        summarizer: SummaryGenerator,
        calendar: Arc<dyn CalendarIntegration>,
        crm: Arc<dyn CrmIntegration>,
    ) -> Self {
        Self {
            summarizer,
            calendar,
            crm,
        }
    }

    pub fn summarizer(&self) -> &SummaryGenerator {
        &self.summarizer
    }

    /// Run the end-of-call sequence for a session.
    pub async fn on_call_end(&self, session: &mut CallSession) -> CallEndReport {
        let (summary, status) = match self.summarizer.generate(session).await {
            Ok(summary) => (summary, CallEndStatus::Success),
            Err(e) => {
                tracing::error!(call_id = %session.call_id(), "Summary failed at call end: {}", e);
                let partial = session.summary().cloned().unwrap_or(CallSummary {
                    text: "No summary available.".to_string(),
                    outcome: CallOutcome::Rejected,
                });
                (partial, CallEndStatus::Error)
            }
        };

        let report = CallEndReport {
            status,
            summary: summary.text,
            outcome: summary.outcome,
        };

        let mut entities = session.entities().clone();
        let missing = entities.missing_booking_fields();
        if !missing.is_empty() {
            tracing::info!(
                call_id = %session.call_id(),
                missing = missing.join(", "),
                "Skipping external actions: required entities missing"
            );
            return report;
        }

        let email = entities.email.as_deref().unwrap_or_default();
        let Some(valid_email) = sanitize_email(email) else {
            tracing::warn!(
                call_id = %session.call_id(),
                "Skipping external actions: invalid email"
            );
            return report;
        };
        entities.email = Some(valid_email);

        // Both actions run together; one failing never cancels the other
        let (event, lead) = tokio::join!(
            self.calendar.create_event(&entities),
            self.crm.create_lead(&entities)
        );

        match event {
            Ok(event) => tracing::info!(
                call_id = %session.call_id(),
                link = event.link.as_deref().unwrap_or(""),
                "Calendar event created"
            ),
            Err(e) => tracing::warn!(call_id = %session.call_id(), "Calendar action failed: {}", e),
        }

        match lead {
            Ok(true) => tracing::info!(call_id = %session.call_id(), "CRM lead created"),
            Ok(false) => tracing::warn!(call_id = %session.call_id(), "CRM rejected the lead"),
            Err(e) => tracing::warn!(call_id = %session.call_id(), "CRM action failed: {}", e),
        }

        report
    }
}
