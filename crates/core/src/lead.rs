//! Lead entity record and merge rules
//!
//! The entity record accumulates across a call. Fields are only ever
//! overwritten by a non-null extracted value; `requirements` grows as an
//! order-preserving de-duplicated union and never shrinks.

use serde::{Deserialize, Serialize};

/// Structured lead-qualification fields captured from a call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadEntities {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    pub meeting_date: Option<String>,
    pub meeting_time: Option<String>,
    pub industry: Option<String>,
}

/// A partial extraction to fold into a [`LeadEntities`] record
///
/// Every field is optional; absent or null fields never clear the
/// corresponding entity. Unknown keys in the source JSON are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadDelta {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub meeting_date: Option<String>,
    pub meeting_time: Option<String>,
    pub industry: Option<String>,
}

impl LeadDelta {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.company_name.is_none()
            && self.requirements.as_ref().map_or(true, |r| r.is_empty())
            && self.meeting_date.is_none()
            && self.meeting_time.is_none()
            && self.industry.is_none()
    }
}

impl LeadEntities {
    /// Merge a delta into this record.
    ///
    /// Scalar fields are overwritten only by non-null incoming values.
    /// `requirements` is unioned in order, dropping duplicates.
    pub fn merge(&mut self, delta: &LeadDelta) {
        merge_field(&mut self.name, &delta.name);
        merge_field(&mut self.email, &delta.email);
        merge_field(&mut self.company_name, &delta.company_name);
        merge_field(&mut self.meeting_date, &delta.meeting_date);
        merge_field(&mut self.meeting_time, &delta.meeting_time);
        merge_field(&mut self.industry, &delta.industry);

        if let Some(incoming) = &delta.requirements {
            for req in incoming {
                if !req.trim().is_empty() && !self.requirements.contains(req) {
                    self.requirements.push(req.clone());
                }
            }
        }
    }

    /// All five fields required before calendar/CRM actions may fire
    pub fn has_booking_details(&self) -> bool {
        self.name.is_some()
            && self.email.is_some()
            && self.company_name.is_some()
            && self.meeting_date.is_some()
            && self.meeting_time.is_some()
    }

    /// Names of the required booking fields that are still missing
    pub fn missing_booking_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.is_none() {
            missing.push("name");
        }
        if self.email.is_none() {
            missing.push("email");
        }
        if self.company_name.is_none() {
            missing.push("company_name");
        }
        if self.meeting_date.is_none() {
            missing.push("meeting_date");
        }
        if self.meeting_time.is_none() {
            missing.push("meeting_time");
        }
        missing
    }
}

fn merge_field(current: &mut Option<String>, incoming: &Option<String>) {
    if let Some(value) = incoming {
        *current = Some(value.clone());
    }
}
