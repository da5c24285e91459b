//! Stub and recording integrations

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use salescall_core::LeadEntities;

use crate::{CalendarEvent, CalendarIntegration, CrmIntegration, IntegrationError};

/// Logging calendar stub for development
#[derive(Default)]
pub struct StubCalendarIntegration;

#[async_trait]
impl CalendarIntegration for StubCalendarIntegration {
    async fn create_event(&self, entities: &LeadEntities) -> Result<CalendarEvent, IntegrationError> {
        let date = entities
            .meeting_date
            .as_deref()
            .ok_or(IntegrationError::MissingField("meeting_date"))?;
        let time = entities
            .meeting_time
            .as_deref()
            .ok_or(IntegrationError::MissingField("meeting_time"))?;

        tracing::info!(
            company = entities.company_name.as_deref().unwrap_or("unknown"),
            date,
            time,
            "Stub calendar: consultation event created"
        );

        Ok(CalendarEvent {
            link: Some(format!("https://calendar.example/event/{}-{}", date, time)),
            event_id: None,
        })
    }
}

/// Logging CRM stub for development
#[derive(Default)]
pub struct StubCrmIntegration;

#[async_trait]
impl CrmIntegration for StubCrmIntegration {
    async fn create_lead(&self, entities: &LeadEntities) -> Result<bool, IntegrationError> {
        tracing::info!(
            name = entities.name.as_deref().unwrap_or("unknown"),
            company = entities.company_name.as_deref().unwrap_or("unknown"),
            "Stub CRM: lead created"
        );
        Ok(true)
    }
}

/// Recording calendar fake for tests; counts invocations and can be
/// configured to fail.
#[derive(Default)]
pub struct RecordingCalendar {
    invocations: AtomicUsize,
    received: Mutex<Vec<LeadEntities>>,
    fail: bool,
}

impl RecordingCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<LeadEntities> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl CalendarIntegration for RecordingCalendar {
    async fn create_event(&self, entities: &LeadEntities) -> Result<CalendarEvent, IntegrationError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(entities.clone());
        if self.fail {
            return Err(IntegrationError::Calendar("provider unavailable".to_string()));
        }
        Ok(CalendarEvent {
            link: Some("https://calendar.example/event/test".to_string()),
            event_id: Some("evt-1".to_string()),
        })
    }
}

/// Recording CRM fake for tests
#[derive(Default)]
pub struct RecordingCrm {
    invocations: AtomicUsize,
    received: Mutex<Vec<LeadEntities>>,
    fail: bool,
}

impl RecordingCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<LeadEntities> {
        self.received.lock().clone()
    }
}

#[async_trait]
impl CrmIntegration for RecordingCrm {
    async fn create_lead(&self, entities: &LeadEntities) -> Result<bool, IntegrationError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(entities.clone());
        if self.fail {
            return Err(IntegrationError::Crm("provider unavailable".to_string()));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booked_entities() -> LeadEntities {
        LeadEntities {
            name: Some("Asha Rao".into()),
            email: Some("asha@example.com".into()),
            company_name: Some("Acme Retail".into()),
            meeting_date: Some("12-08-2026".into()),
            meeting_time: Some("14:30".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_stub_calendar_requires_schedule() {
        let calendar = StubCalendarIntegration;
        let event = calendar.create_event(&booked_entities()).await.unwrap();
        assert!(event.link.is_some());

        let mut missing = booked_entities();
        missing.meeting_time = None;
        assert!(calendar.create_event(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_recording_fakes_count_calls() {
        let calendar = RecordingCalendar::new();
        let crm = RecordingCrm::failing();

        calendar.create_event(&booked_entities()).await.unwrap();
        assert!(crm.create_lead(&booked_entities()).await.is_err());

        assert_eq!(calendar.invocations(), 1);
        assert_eq!(crm.invocations(), 1);
        assert_eq!(calendar.received()[0].name.as_deref(), Some("Asha Rao"));
    }
}
