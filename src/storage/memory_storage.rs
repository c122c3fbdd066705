use crate::{
    error::{Result, TicketAppError},
    storage::{Collection, Revision, Storage},
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory key/value storage, the process-local analogue of browser storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    collections: RwLock<HashMap<String, (Revision, Vec<Value>)>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        true
    }

    async fn read_collection(&self, key: &str) -> Result<Collection> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(key)
            .map(|(revision, records)| Collection {
                revision: *revision,
                records: records.clone(),
            })
            .unwrap_or_default())
    }

    async fn write_collection(
        &self,
        key: &str,
        expected: Revision,
        records: &[Value],
    ) -> Result<Revision> {
        let mut collections = self.collections.write().await;
        let current = collections
            .get(key)
            .map(|(revision, _)| *revision)
            .unwrap_or(Revision::ABSENT);

        if current != expected {
            return Err(TicketAppError::Conflict {
                key: key.to_string(),
            });
        }

        let next = Revision::new(current.value() + 1);
        collections.insert(key.to_string(), (next, records.to_vec()));
        Ok(next)
    }
}
