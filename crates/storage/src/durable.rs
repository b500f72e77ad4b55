//! Whole-collection durable stores.
//!
//! A [`DurableStore`] holds four independent collections of JSON records
//! and supports exactly two operations: load a collection, and replace a
//! collection. Everything else (lookups, transactions, locking) is layered
//! on top by [`crate::CollectionStorage`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StorageError;

/// The four top-level record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Accounts,
    Tasks,
    Submissions,
    Transactions,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Accounts,
        Collection::Tasks,
        Collection::Submissions,
        Collection::Transactions,
    ];

    /// Stable name, used as the file stem by [`JsonFileStore`].
    pub fn name(self) -> &'static str {
        match self {
            Collection::Accounts => "accounts",
            Collection::Tasks => "tasks",
            Collection::Submissions => "submissions",
            Collection::Transactions => "transactions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse read-modify-write persistence for record collections.
///
/// `load` returns records in the order they were last saved; a collection
/// that was never saved loads as empty. `save` replaces the whole
/// collection.
#[async_trait]
pub trait DurableStore: Send + Sync + 'static {
    async fn load(&self, collection: Collection) -> Result<Vec<serde_json::Value>, StorageError>;

    async fn save(
        &self,
        collection: Collection,
        records: Vec<serde_json::Value>,
    ) -> Result<(), StorageError>;
}

/// Volatile store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Collection, Vec<serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn load(&self, collection: Collection) -> Result<Vec<serde_json::Value>, StorageError> {
        let collections = self.collections.lock().await;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn save(
        &self,
        collection: Collection,
        records: Vec<serde_json::Value>,
    ) -> Result<(), StorageError> {
        self.collections.lock().await.insert(collection, records);
        Ok(())
    }
}

/// One pretty-printed JSON array file per collection inside a data
/// directory (`accounts.json`, `tasks.json`, ...).
///
/// Saves go through a temporary file and a rename, so a collection file is
/// always either the old or the new contents.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(io_error(&dir))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }
}

#[async_trait]
impl DurableStore for JsonFileStore {
    async fn load(&self, collection: Collection) -> Result<Vec<serde_json::Value>, StorageError> {
        let path = self.path_for(collection);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&path)(e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Serialization {
            collection: collection.name(),
            source,
        })
    }

    async fn save(
        &self,
        collection: Collection,
        records: Vec<serde_json::Value>,
    ) -> Result<(), StorageError> {
        let path = self.path_for(collection);
        let tmp = self.dir.join(format!("{}.json.tmp", collection.name()));
        let body =
            serde_json::to_vec_pretty(&records).map_err(|source| StorageError::Serialization {
                collection: collection.name(),
                source,
            })?;
        tokio::fs::write(&tmp, body).await.map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(io_error(&path))?;
        tracing::debug!(collection = collection.name(), path = %path.display(), "collection saved");
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError {
    let path = path.display().to_string();
    move |source| StorageError::Io { path, source }
}
