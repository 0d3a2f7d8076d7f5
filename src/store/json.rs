//! JSON-file storage backend.
//!
//! Each collection lives in one JSON file under the data directory and is
//! rewritten in full on every save. A missing file loads as an empty
//! collection; a corrupt file is logged and loads as empty rather than
//! blocking startup.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Storage;
use crate::domain::lead::Lead;
use crate::domain::record::CallRecord;
use crate::error::Result;

const LEADS_COLLECTION: &str = "leads";
const RECORDS_COLLECTION: &str = "call-records";

/// File-backed storage rooted at a data directory.
pub struct JsonStorage {
    dir: PathBuf,
}

impl JsonStorage {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    async fn load_collection<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.collection_path(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice(&bytes) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::error!(
                    collection = name,
                    path = %path.display(),
                    error = %e,
                    "Failed to parse persisted collection, starting empty"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn save_collection<T: Serialize>(&self, name: &str, items: &[T]) -> Result<()> {
        let path = self.collection_path(name);
        let bytes = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Storage for JsonStorage {
    async fn load_leads(&self) -> Result<Vec<Lead>> {
        self.load_collection(LEADS_COLLECTION).await
    }

    async fn save_leads(&self, leads: &[Lead]) -> Result<()> {
        self.save_collection(LEADS_COLLECTION, leads).await
    }

    async fn load_records(&self) -> Result<Vec<CallRecord>> {
        self.load_collection(RECORDS_COLLECTION).await
    }

    async fn save_records(&self, records: &[CallRecord]) -> Result<()> {
        self.save_collection(RECORDS_COLLECTION, records).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lead::DEFAULT_TIME_ZONE;
    use crate::domain::record::OperatorId;
    use chrono::Utc;

    #[tokio::test]
    async fn missing_files_load_as_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::open(dir.path()).unwrap();

        assert!(storage.load_leads().await.unwrap().is_empty());
        assert!(storage.load_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collections_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::open(dir.path()).unwrap();

        let lead = Lead::new("jahid", "+8800000000000", DEFAULT_TIME_ZONE, None);
        let record = crate::domain::record::CallRecord::successful(
            "call_1",
            OperatorId::from("op_1"),
            &lead,
            Utc::now(),
        );

        storage.save_leads(std::slice::from_ref(&lead)).await.unwrap();
        storage
            .save_records(std::slice::from_ref(&record))
            .await
            .unwrap();

        let leads = storage.load_leads().await.unwrap();
        assert_eq!(leads, vec![lead]);
        let records = storage.load_records().await.unwrap();
        assert_eq!(records, vec![record]);
    }

    #[tokio::test]
    async fn corrupt_files_load_as_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::open(dir.path()).unwrap();

        tokio::fs::write(dir.path().join("leads.json"), b"not json")
            .await
            .unwrap();
        assert!(storage.load_leads().await.unwrap().is_empty());
    }
}
