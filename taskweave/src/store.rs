//! Persistence of top-level task responses.
//!
//! The executor hands every response it produces to a [`ResponseStore`].
//! Two stores ship with the crate: an in-memory one for tests and embedding,
//! and a directory of JSON files, one file per stored response.

use crate::error::StoreError;
use crate::response::TaskResponse;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A response together with its storage record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredTaskResponse {
    pub id: Uuid,
    pub stored_at: DateTime<Utc>,
    /// False when the store failed and the record exists only in memory
    pub persisted: bool,
    pub response: TaskResponse,
}

impl StoredTaskResponse {
    /// Wraps a response that has been written to a store.
    pub fn persisted(response: TaskResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            stored_at: Utc::now(),
            persisted: true,
            response,
        }
    }

    /// Wraps a response that no store accepted.
    pub fn unpersisted(response: TaskResponse) -> Self {
        Self {
            persisted: false,
            ..Self::persisted(response)
        }
    }
}

/// Destination for finished top-level responses.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    async fn store(&self, response: TaskResponse) -> Result<StoredTaskResponse, StoreError>;
}

/// Store that keeps records in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryResponseStore {
    records: Arc<RwLock<Vec<StoredTaskResponse>>>,
}

impl InMemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored records, oldest first.
    pub fn records(&self) -> Vec<StoredTaskResponse> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map_or(0, |records| records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseStore for InMemoryResponseStore {
    async fn store(&self, response: TaskResponse) -> Result<StoredTaskResponse, StoreError> {
        let stored = StoredTaskResponse::persisted(response);
        self.records
            .write()
            .map_err(|e| StoreError::Rejected(e.to_string()))?
            .push(stored.clone());
        Ok(stored)
    }
}

/// Store that writes each record to `<dir>/<id>.json`.
#[derive(Clone, Debug)]
pub struct JsonFileResponseStore {
    dir: PathBuf,
}

impl JsonFileResponseStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record file for `id`.
    pub fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Reads a stored record back.
    pub async fn load(&self, id: Uuid) -> Result<StoredTaskResponse, StoreError> {
        let contents = tokio::fs::read_to_string(self.record_path(id)).await?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[async_trait]
impl ResponseStore for JsonFileResponseStore {
    async fn store(&self, response: TaskResponse) -> Result<StoredTaskResponse, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::DirectoryFailed(e.to_string()))?;

        let stored = StoredTaskResponse::persisted(response);
        let json = serde_json::to_string_pretty(&stored)?;
        tokio::fs::write(self.record_path(stored.id), json).await?;

        tracing::debug!(id = %stored.id, task = %stored.response.task_id, "response stored");
        Ok(stored)
    }
}
