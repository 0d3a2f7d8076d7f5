//! Durable persistence for the lead and call-record collections.
//!
//! The durable layer is a key-value store with load/save semantics: two
//! named collections (`leads` and `call-records`), each loaded once at
//! startup and rewritten in full after every mutation. The [`Storage`] trait
//! keeps the backend pluggable; [`JsonStorage`] is the file-backed reference
//! implementation and [`MemoryStorage`] backs tests.

use async_trait::async_trait;

use crate::domain::lead::Lead;
use crate::domain::record::CallRecord;
use crate::error::Result;

pub mod json;
pub mod memory;

pub use json::JsonStorage;
pub use memory::MemoryStorage;

/// Storage trait for persisting the two entity collections.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Load the persisted lead collection, in stored order.
    async fn load_leads(&self) -> Result<Vec<Lead>>;

    /// Rewrite the lead collection in full.
    async fn save_leads(&self, leads: &[Lead]) -> Result<()>;

    /// Load the persisted call-record collection, in stored order.
    async fn load_records(&self) -> Result<Vec<CallRecord>>;

    /// Rewrite the call-record collection in full.
    async fn save_records(&self, records: &[CallRecord]) -> Result<()>;
}
