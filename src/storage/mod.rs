use crate::{
    config::{StorageBackend, StorageConfig},
    error::{Result, TicketAppError},
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[cfg(feature = "file-storage")]
pub mod file_storage;
pub mod memory_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

/// Version stamp of a stored collection, used for compare-and-swap writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Revision(u64);

impl Revision {
    /// Revision of a collection that has never been written
    pub const ABSENT: Revision = Revision(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_absent(&self) -> bool {
        *self == Self::ABSENT
    }
}

/// An ordered collection of records as read from storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub revision: Revision,
    pub records: Vec<Value>,
}

impl Collection {
    /// Decodes every record into `T`
    pub fn decode<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        self.records
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(TicketAppError::from))
            .collect()
    }

    /// Decodes the records that fit `T`, logging and skipping the rest
    pub fn decode_valid<T: DeserializeOwned>(self, key: &str) -> Vec<T> {
        self.records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(key, index, "skipping unreadable record: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// Encodes typed records for `Storage::write_collection`
pub fn encode_records<T: Serialize>(items: &[T]) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(TicketAppError::from))
        .collect()
}

/// Persistence adapter for whole collections of records
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initializes the storage backend
    async fn initialize(&self) -> Result<()>;

    /// Checks if the backend has been initialized
    async fn is_initialized(&self) -> bool;

    /// Reads the full collection stored under `key`.
    /// An absent key yields an empty collection at `Revision::ABSENT`.
    async fn read_collection(&self, key: &str) -> Result<Collection>;

    /// Replaces the collection under `key` if its revision still equals
    /// `expected`, returning the new revision. Fails with
    /// `TicketAppError::Conflict` otherwise.
    async fn write_collection(
        &self,
        key: &str,
        expected: Revision,
        records: &[Value],
    ) -> Result<Revision>;
}

/// Opens the backend selected in configuration
pub fn open_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        StorageBackend::Memory => Arc::new(memory_storage::MemoryStorage::new()),

        #[cfg(feature = "file-storage")]
        StorageBackend::File => Arc::new(file_storage::FileStorage::new(&config.data_dir)),
        #[cfg(not(feature = "file-storage"))]
        StorageBackend::File => {
            return Err(TicketAppError::ConfigError(
                "file storage requires the 'file-storage' feature".to_string(),
            ))
        }

        #[cfg(feature = "sqlite-storage")]
        StorageBackend::Sqlite => Arc::new(sqlite_storage::SqliteStorage::open(&config.sqlite_path)?),
        #[cfg(not(feature = "sqlite-storage"))]
        StorageBackend::Sqlite => {
            return Err(TicketAppError::ConfigError(
                "sqlite storage requires the 'sqlite-storage' feature".to_string(),
            ))
        }
    };

    tracing::debug!(backend = ?config.backend, "opened storage");
    Ok(storage)
}
