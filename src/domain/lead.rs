//! Lead entities and their call lifecycle.
//!
//! A lead moves through a small state machine driven exclusively by the
//! dispatcher:
//!
//! ```text
//! pending ──begin_attempt()──> calling ──record_success()──> call-successful
//!                                 │
//!                                 └──record_failure()──> need-retry   (retry_count < 3)
//!                                 └──record_failure()──> completed    (retry_count >= 3)
//! ```
//!
//! `calling` is always transient: it is set immediately before a dispatch
//! attempt and overwritten once the attempt resolves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attempt budget before a lead is marked `completed` (exhausted).
pub const MAX_DIAL_ATTEMPTS: u32 = 3;

/// Time zone applied to leads that don't carry one of their own.
pub const DEFAULT_TIME_ZONE: &str = "(UTC+06:00) Dhaka";

/// Unique identifier for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub Uuid);

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display only first 8 characters for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl From<Uuid> for LeadId {
    fn from(uuid: Uuid) -> Self {
        LeadId(uuid)
    }
}

impl std::ops::Deref for LeadId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Lifecycle state of a lead.
///
/// Serialized with the kebab-case strings used by the durable store
/// (`"call-successful"`, `"need-retry"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadStatus {
    Pending,
    Calling,
    CallSuccessful,
    NeedRetry,
    Completed,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Calling => "calling",
            LeadStatus::CallSuccessful => "call-successful",
            LeadStatus::NeedRetry => "need-retry",
            LeadStatus::Completed => "completed",
        }
    }
}

/// A contact record eligible for outbound calling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Unique identifier, assigned at creation.
    pub id: LeadId,

    /// Contact's first name.
    pub first_name: String,

    /// Normalized E.164-like phone number (see [`crate::ingest::normalize_phone`]).
    pub phone_number: String,

    /// When the lead entered the system.
    pub created_at: DateTime<Utc>,

    /// Display time zone for the contact.
    pub time_zone: String,

    /// The lead's ID in an external CRM, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,

    /// Current lifecycle state.
    pub status: LeadStatus,

    /// Number of failed dispatch attempts so far.
    pub retry_count: u32,

    /// When the most recent dispatch attempt resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_called: Option<DateTime<Utc>>,
}

impl Lead {
    /// Create a new pending lead.
    pub fn new(
        first_name: impl Into<String>,
        phone_number: impl Into<String>,
        time_zone: impl Into<String>,
        reference_id: Option<String>,
    ) -> Self {
        Self {
            id: LeadId::from(Uuid::new_v4()),
            first_name: first_name.into(),
            phone_number: phone_number.into(),
            created_at: Utc::now(),
            time_zone: time_zone.into(),
            reference_id,
            status: LeadStatus::Pending,
            retry_count: 0,
            last_called: None,
        }
    }

    /// Mark the lead as being dialed. Set immediately before a dispatch
    /// attempt and always overwritten once the attempt resolves.
    pub fn begin_attempt(&mut self) {
        self.status = LeadStatus::Calling;
    }

    /// Resolve the in-flight attempt as successful.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.status = LeadStatus::CallSuccessful;
        self.last_called = Some(now);
    }

    /// Resolve the in-flight attempt as failed, consuming one attempt from
    /// the retry budget. Returns `true` when the budget is exhausted and the
    /// lead has been marked `completed`.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        self.retry_count += 1;
        let exhausted = self.retry_count >= MAX_DIAL_ATTEMPTS;
        self.status = if exhausted {
            LeadStatus::Completed
        } else {
            LeadStatus::NeedRetry
        };
        self.last_called = Some(now);
        exhausted
    }

    /// Substring match over name (case-insensitive) and phone number (raw).
    pub fn matches(&self, term: &str) -> bool {
        self.first_name
            .to_lowercase()
            .contains(&term.to_lowercase())
            || self.phone_number.contains(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead() -> Lead {
        Lead::new("jahid", "+8800000000000", DEFAULT_TIME_ZONE, None)
    }

    #[test]
    fn new_lead_starts_pending_with_zero_retries() {
        let lead = lead();
        assert_eq!(lead.status, LeadStatus::Pending);
        assert_eq!(lead.retry_count, 0);
        assert!(lead.last_called.is_none());
    }

    #[test]
    fn three_failures_exhaust_the_retry_budget() {
        let mut lead = lead();
        let now = Utc::now();

        lead.begin_attempt();
        assert!(!lead.record_failure(now));
        assert_eq!(lead.status, LeadStatus::NeedRetry);
        assert_eq!(lead.retry_count, 1);

        lead.begin_attempt();
        assert!(!lead.record_failure(now));
        assert_eq!(lead.status, LeadStatus::NeedRetry);
        assert_eq!(lead.retry_count, 2);

        lead.begin_attempt();
        assert!(lead.record_failure(now));
        assert_eq!(lead.status, LeadStatus::Completed);
        assert_eq!(lead.retry_count, 3);
    }

    #[test]
    fn success_after_failures_keeps_the_retry_count() {
        let mut lead = lead();
        let now = Utc::now();

        lead.begin_attempt();
        lead.record_failure(now);
        lead.begin_attempt();
        lead.record_failure(now);
        lead.begin_attempt();
        lead.record_success(now);

        assert_eq!(lead.status, LeadStatus::CallSuccessful);
        assert_eq!(lead.retry_count, 2);
        assert_eq!(lead.last_called, Some(now));
    }

    #[test]
    fn status_round_trips_through_kebab_case() {
        let json = serde_json::to_string(&LeadStatus::CallSuccessful).unwrap();
        assert_eq!(json, "\"call-successful\"");
        let status: LeadStatus = serde_json::from_str("\"need-retry\"").unwrap();
        assert_eq!(status, LeadStatus::NeedRetry);
    }

    #[test]
    fn matches_ignores_name_case_but_not_phone() {
        let lead = lead();
        assert!(lead.matches("JAH"));
        assert!(lead.matches("+880"));
        assert!(!lead.matches("555"));
    }
}
