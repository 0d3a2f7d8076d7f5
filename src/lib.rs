//! Outbound lead management and rate-limited bulk call dispatch.
//!
//! This crate ingests contact ("lead") records from CSV, tracks each lead
//! through a call lifecycle, and drives a sequential, rate-limited calling
//! campaign against an external telephony API. Successful attempts are
//! appended to an immutable call ledger for auditing.
//!
//! The [`manager::OutboundManager`] is the single entry point: it owns the
//! lead store and the ledger, dispatches calls through a pluggable
//! [`http::TelephonyClient`], and broadcasts state changes over an event
//! channel that a presentation layer can subscribe to.

pub mod campaign;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod events;
pub mod http;
pub mod ingest;
pub mod leads;
pub mod ledger;
pub mod manager;
pub mod notify;
pub mod store;

// Re-export commonly used types
pub use campaign::{CampaignConfig, CampaignRunner, RunProgress, RunState, RunSummary};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use domain::lead::{DEFAULT_TIME_ZONE, Lead, LeadId, LeadStatus, MAX_DIAL_ATTEMPTS};
pub use domain::record::{CallRecord, LeadSnapshot, OperatorId, RecordId, RecordStatus};
pub use error::{OutdialError, Result};
pub use events::{Event, EventBus};
pub use http::{
    DialRequest, DialResponse, MockTelephonyClient, ReqwestTelephonyClient, TelephonyClient,
};
pub use ingest::{IngestOutcome, LEADS_TEMPLATE_CSV, ingest_leads, normalize_phone};
pub use manager::{ImportSummary, OutboundManager};
pub use notify::{Notification, NotificationQueue, Severity};
pub use store::{JsonStorage, MemoryStorage, Storage};
