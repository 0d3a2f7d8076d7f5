//! Core domain types for the outbound calling system.
//!
//! This module contains pure domain types with no persistence dependencies:
//! - Leads and their call lifecycle
//! - Call records (the audit ledger's entries)

pub mod lead;
pub mod record;
