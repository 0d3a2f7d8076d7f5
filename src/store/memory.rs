//! In-memory storage for tests and ephemeral sessions.

use async_trait::async_trait;
use parking_lot::Mutex;

use super::Storage;
use crate::domain::lead::Lead;
use crate::domain::record::CallRecord;
use crate::error::Result;

/// Storage backend that keeps both collections in process memory.
#[derive(Default)]
pub struct MemoryStorage {
    leads: Mutex<Vec<Lead>>,
    records: Mutex<Vec<CallRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_leads(&self) -> Result<Vec<Lead>> {
        Ok(self.leads.lock().clone())
    }

    async fn save_leads(&self, leads: &[Lead]) -> Result<()> {
        *self.leads.lock() = leads.to_vec();
        Ok(())
    }

    async fn load_records(&self) -> Result<Vec<CallRecord>> {
        Ok(self.records.lock().clone())
    }

    async fn save_records(&self, records: &[CallRecord]) -> Result<()> {
        *self.records.lock() = records.to_vec();
        Ok(())
    }
}
