//! # Record Store
//!
//! [`RecordStore`] keys batch documents by [`BatchId`]. Records come back
//! exactly as they were written: the fingerprint of a record read from the
//! store must equal the fingerprint of the record that was put.
//!
//! - [`MemoryRecordStore`]: `DashMap`, for development and tests.
//! - [`FileRecordStore`]: one pretty-printed `{batch_id}.json` per batch
//!   under a directory. Batch identifiers cannot contain `/` or `.`, so
//!   every key maps to a file directly inside that directory.
//!
//! The Postgres store lives in the API crate next to its migrations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use harvest_core::{BatchId, BatchRecord};
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;

/// Keyed storage for batch records.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, id: &BatchId) -> Result<Option<BatchRecord>, StoreError>;

    /// Store a new record. Fails with [`StoreError::Conflict`] if `id` exists.
    async fn insert(&self, id: &BatchId, record: &BatchRecord) -> Result<(), StoreError>;

    /// Create or replace.
    async fn put(&self, id: &BatchId, record: &BatchRecord) -> Result<(), StoreError>;

    /// Every stored record, in no particular order.
    async fn list(&self) -> Result<Vec<BatchRecord>, StoreError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

// ─── In-memory ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: DashMap<BatchId, BatchRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: &BatchId) -> Result<Option<BatchRecord>, StoreError> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn insert(&self, id: &BatchId, record: &BatchRecord) -> Result<(), StoreError> {
        match self.records.entry(id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn put(&self, id: &BatchId, record: &BatchRecord) -> Result<(), StoreError> {
        self.records.insert(id.clone(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BatchRecord>, StoreError> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ─── Directory of JSON files ────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &BatchId) -> PathBuf {
        self.root.join(format!("{}.json", id.as_str()))
    }

    fn encode(record: &BatchRecord) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(record).map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<BatchRecord, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt {
            id: key.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn get(&self, id: &BatchId) -> Result<Option<BatchRecord>, StoreError> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => Ok(Some(Self::decode(id.as_str(), &bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, id: &BatchId, record: &BatchRecord) -> Result<(), StoreError> {
        let bytes = Self::encode(record)?;
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(id))
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Conflict(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn put(&self, id: &BatchId, record: &BatchRecord) -> Result<(), StoreError> {
        let bytes = Self::encode(record)?;
        // Write beside the target and rename so readers never see a partial file.
        let tmp = self.root.join(format!("{}.json.tmp", id.as_str()));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, self.path_for(id)).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BatchRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let bytes = tokio::fs::read(&path).await?;
            records.push(Self::decode(&key, &bytes)?);
        }
        Ok(records)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let meta = tokio::fs::metadata(&self.root).await?;
        if meta.is_dir() {
            Ok(())
        } else {
            Err(StoreError::Backend(format!(
                "{} is not a directory",
                self.root.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> BatchId {
        BatchId::new(s).unwrap()
    }

    fn record(product: &str) -> BatchRecord {
        BatchRecord::from_value(json!({
            "batch_id": "B1",
            "product": product,
            "village": {"name": "Sarmoli", "elevation_m": 2200.5},
            "farmers": [{"farmer_name": "Asha", "locations": []}],
            "notes": null
        }))
        .unwrap()
    }

    async fn exercise(store: &dyn RecordStore) {
        assert!(store.get(&id("B1")).await.unwrap().is_none());

        store.insert(&id("B1"), &record("rajma")).await.unwrap();
        let back = store.get(&id("B1")).await.unwrap().unwrap();
        assert_eq!(back, record("rajma"));
        assert_eq!(back.fingerprint().unwrap(), record("rajma").fingerprint().unwrap());

        assert!(matches!(
            store.insert(&id("B1"), &record("other")).await,
            Err(StoreError::Conflict(_))
        ));

        store.put(&id("B1"), &record("amaranth")).await.unwrap();
        assert_eq!(
            store.get(&id("B1")).await.unwrap().unwrap().product(),
            Some("amaranth")
        );

        store.put(&id("B2"), &record("rajma")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
        store.ping().await.unwrap();
    }

    #[tokio::test]
    async fn memory_store_contract() {
        let store = MemoryRecordStore::new();
        exercise(&store).await;
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn file_store_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::open(dir.path().join("batches")).await.unwrap();
        exercise(&store).await;
        assert!(dir.path().join("batches/B1.json").exists());
        assert!(!dir.path().join("batches/B1.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_documents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("BAD.json"), b"[1, 2]").await.unwrap();
        assert!(matches!(
            store.get(&id("BAD")).await,
            Err(StoreError::Corrupt { .. })
        ));
        assert!(store.list().await.is_err());
    }

    #[tokio::test]
    async fn file_store_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::open(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("README.txt"), b"x").await.unwrap();
        store.put(&id("B1"), &record("rajma")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
