//! Call records - immutable snapshots of successful dispatch attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::lead::{Lead, LeadId};

/// Identity of the operator who triggered a call, as reported by the
/// external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorId(pub String);

impl std::fmt::Display for OperatorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OperatorId {
    fn from(s: &str) -> Self {
        OperatorId(s.to_string())
    }
}

/// Unique identifier for a call record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        RecordId(uuid)
    }
}

/// Outcome stamped on a call record.
///
/// The ledger is a success-only audit trail: `Failed` is part of the durable
/// format but is never produced by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Successful,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Successful => "successful",
            RecordStatus::Failed => "failed",
        }
    }
}

/// Copy of a lead's contact fields at the time of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSnapshot {
    pub first_name: String,
    pub phone_number: String,
    pub time_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

impl From<&Lead> for LeadSnapshot {
    fn from(lead: &Lead) -> Self {
        Self {
            first_name: lead.first_name.clone(),
            phone_number: lead.phone_number.clone(),
            time_zone: lead.time_zone.clone(),
            reference_id: lead.reference_id.clone(),
        }
    }
}

/// An immutable snapshot of one successful dispatch.
///
/// `lead_id` is a non-owning back-reference used for display and lookup;
/// deleting the lead never deletes its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: RecordId,

    /// Identifier from the call API, or a locally synthesized fallback.
    pub call_id: String,

    /// Operator who triggered the call.
    pub auth_id: OperatorId,

    pub lead_id: LeadId,

    pub lead_data: LeadSnapshot,

    pub timestamp: DateTime<Utc>,

    pub status: RecordStatus,
}

impl CallRecord {
    /// Build the record for a successful dispatch attempt.
    pub fn successful(
        call_id: impl Into<String>,
        auth_id: OperatorId,
        lead: &Lead,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::from(Uuid::new_v4()),
            call_id: call_id.into(),
            auth_id,
            lead_id: lead.id,
            lead_data: LeadSnapshot::from(lead),
            timestamp,
            status: RecordStatus::Successful,
        }
    }

    /// Substring match over lead name, phone number, and call id.
    pub fn matches(&self, term: &str) -> bool {
        let term_lower = term.to_lowercase();
        self.lead_data.first_name.to_lowercase().contains(&term_lower)
            || self.lead_data.phone_number.contains(term)
            || self.call_id.to_lowercase().contains(&term_lower)
    }
}
