//! The call ledger - append-only audit trail of successful dispatches.
//!
//! Records are kept newest-first and never mutated. The only destructive
//! operation is an explicit full clear; obtaining operator confirmation for
//! it is the caller's responsibility.

use std::sync::Arc;

use crate::domain::record::CallRecord;
use crate::error::Result;
use crate::store::Storage;

/// Column order of the flat export.
const EXPORT_HEADER: &str =
    "Call ID,Auth ID,Lead Name,Phone Number,Time Zone,Reference ID,Timestamp,Status";

/// Append-only, newest-first collection of [`CallRecord`] entries.
pub struct CallLedger {
    records: Vec<CallRecord>,
    storage: Arc<dyn Storage>,
}

impl CallLedger {
    /// Load the persisted collection.
    pub async fn load(storage: Arc<dyn Storage>) -> Result<Self> {
        let records = storage.load_records().await?;
        tracing::debug!(count = records.len(), "Call ledger loaded");
        Ok(Self { records, storage })
    }

    pub fn all(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a record at the head (newest-first) and persist.
    pub async fn append(&mut self, record: CallRecord) -> Result<()> {
        self.records.insert(0, record);
        self.storage.save_records(&self.records).await
    }

    /// Substring search over lead name, phone number, and call id.
    pub fn search(&self, term: &str) -> Vec<CallRecord> {
        self.records
            .iter()
            .filter(|record| record.matches(term))
            .cloned()
            .collect()
    }

    /// Produce the delimited text export, one row per record, newest-first.
    // TODO: quote fields that contain commas before joining.
    pub fn export_csv(&self) -> String {
        let mut lines = vec![EXPORT_HEADER.to_string()];
        lines.extend(self.records.iter().map(|record| {
            let timestamp = record.timestamp.to_rfc3339();
            [
                record.call_id.as_str(),
                record.auth_id.0.as_str(),
                record.lead_data.first_name.as_str(),
                record.lead_data.phone_number.as_str(),
                record.lead_data.time_zone.as_str(),
                record.lead_data.reference_id.as_deref().unwrap_or(""),
                timestamp.as_str(),
                record.status.as_str(),
            ]
            .join(",")
        }));
        lines.join("\n")
    }

    /// Irreversibly delete every record.
    pub async fn clear_all(&mut self) -> Result<()> {
        self.records.clear();
        self.storage.save_records(&self.records).await
    }
}
