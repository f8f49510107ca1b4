use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use dashmap::DashMap;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::{agent::Agent, workflow::Workflow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(Uuid),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A record the JSON store can manage. The store owns identity and
/// timestamps; records never pick their own id.
pub trait StoredRecord: Clone + Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);
    fn created_at(&self) -> DateTime<Local>;
    fn set_created_at(&mut self, at: DateTime<Local>);
    fn set_updated_at(&mut self, at: DateTime<Local>);
}

impl StoredRecord for Agent {
    fn id(&self) -> Uuid {
        self.id
    }
    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
    fn set_created_at(&mut self, at: DateTime<Local>) {
        self.created_at = at;
    }
    fn set_updated_at(&mut self, at: DateTime<Local>) {
        self.updated_at = at;
    }
}

impl StoredRecord for Workflow {
    fn id(&self) -> Uuid {
        self.id
    }
    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
    fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
    fn set_created_at(&mut self, at: DateTime<Local>) {
        self.created_at = at;
    }
    fn set_updated_at(&mut self, at: DateTime<Local>) {
        self.updated_at = at;
    }
}

/// Whole-file JSON persistence for one record type: a single array file,
/// rewritten in full on every mutation (last write wins, no locking beyond
/// the in-memory map). Load on open, flush on each create/update/delete.
pub struct JsonStore<T> {
    path: PathBuf,
    records: DashMap<Uuid, T>,
}

pub type AgentStore = JsonStore<Agent>;
pub type WorkflowStore = JsonStore<Workflow>;

impl<T: StoredRecord> JsonStore<T> {
    /// Opens the store at `path`, loading any existing records. A missing
    /// file starts an empty store and is written out immediately so later
    /// readers see a valid array.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let store = Self {
            path,
            records: DashMap::new(),
        };
        match fs::read(&store.path).await {
            Ok(bytes) => {
                let list: Vec<T> = serde_json::from_slice(&bytes)?;
                tracing::debug!(
                    "| json store | Path: {} | loaded {} records",
                    store.path.display(),
                    list.len()
                );
                for record in list {
                    store.records.insert(record.id(), record);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                store.flush().await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(store)
    }

    /// All records, oldest first. Ties on the timestamp break by id so the
    /// order (and the file layout) is stable.
    pub fn list(&self) -> Vec<T> {
        let mut records: Vec<T> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| (record.created_at(), record.id()));
        records
    }

    pub fn get(&self, id: Uuid) -> Result<T, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    /// Inserts `record` under a fresh id with both timestamps set to now,
    /// and returns the stored value.
    pub async fn create(&self, mut record: T) -> Result<T, StoreError> {
        let now = Local::now();
        record.set_id(Uuid::new_v4());
        record.set_created_at(now);
        record.set_updated_at(now);

        self.records.insert(record.id(), record.clone());
        self.flush().await?;
        tracing::debug!(
            "| json store | Path: {} | created {}",
            self.path.display(),
            record.id()
        );
        Ok(record)
    }

    /// Replaces the record stored under `id`. The id and creation timestamp
    /// are kept from the stored record regardless of what `record` carries.
    pub async fn update(&self, id: Uuid, mut record: T) -> Result<T, StoreError> {
        let created_at = self.get(id)?.created_at();
        record.set_id(id);
        record.set_created_at(created_at);
        record.set_updated_at(Local::now());

        self.records.insert(id, record.clone());
        self.flush().await?;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        if self.records.remove(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }
        self.flush().await?;
        tracing::debug!(
            "| json store | Path: {} | deleted {}",
            self.path.display(),
            id
        );
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(&self.list())?;
        fs::write(&self.path, data).await?;
        Ok(())
    }
}
