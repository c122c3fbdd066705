use crate::{
    domain::{NewTicket, Ticket, TicketId, TicketStats, TicketUpdate},
    error::{Result, TicketAppError},
    storage::{encode_records, Collection, Revision, Storage},
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Storage key of the ticket collection
pub const TICKETS_KEY: &str = "ticketapp_tickets";

/// CRUD over the ticket collection, shared by every front end
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// All tickets in insertion order. Read failures are logged and yield
    /// an empty list.
    async fn get_all(&self) -> Vec<Ticket>;

    /// Looks a ticket up by id
    async fn get_by_id(&self, id: &TicketId) -> Option<Ticket>;

    /// Validates and appends a new ticket
    async fn create(&self, new: NewTicket) -> Result<Ticket>;

    /// Merges the provided fields into an existing ticket
    async fn update(&self, id: &TicketId, update: TicketUpdate) -> Result<Ticket>;

    /// Removes a ticket; removing an unknown id succeeds
    async fn delete(&self, id: &TicketId) -> Result<()>;

    /// Dashboard counts computed from `get_all`
    async fn get_stats(&self) -> TicketStats {
        TicketStats::from_tickets(&self.get_all().await)
    }
}

/// Ticket store doing whole-collection read-modify-write cycles.
///
/// Writers in this process are serialized by `write_lock`. Writers elsewhere
/// (another process on the same file) are caught by the revision check in
/// `Storage::write_collection` and reported as `TicketAppError::Conflict`.
///
/// Mutations work on the raw stored records: records this crate cannot
/// decode, unknown keys and original `createdAt` spellings are written back
/// untouched. Only the record being created or updated is re-encoded.
pub struct TicketStore {
    storage: Arc<dyn Storage>,
    write_lock: Mutex<()>,
}

/// Keys an update may overwrite in a stored record
const EDITABLE_FIELDS: [&str; 4] = ["title", "description", "status", "priority"];

/// The `id` of a raw record, readable even when the rest of it is not
fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

impl TicketStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    /// Prepares the backend and seeds the sample tickets into a collection
    /// that has never been written
    pub async fn initialize(&self, seed_samples: bool) -> Result<()> {
        self.storage.initialize().await?;
        if !seed_samples {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let current = self.storage.read_collection(TICKETS_KEY).await?;
        if !current.revision.is_absent() {
            return Ok(());
        }

        let samples = Ticket::samples();
        match self.save(Revision::ABSENT, &encode_records(&samples)?).await {
            Ok(_) => {
                tracing::info!(count = samples.len(), "seeded sample tickets");
                Ok(())
            }
            // Someone else initialized the collection first
            Err(TicketAppError::Conflict { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, expected: Revision, records: &[Value]) -> Result<Revision> {
        self.storage
            .write_collection(TICKETS_KEY, expected, records)
            .await
            .map_err(|e| {
                if matches!(e, TicketAppError::Conflict { .. }) {
                    tracing::warn!("ticket collection changed underneath us, write rejected");
                }
                e
            })
    }
}

#[async_trait]
impl TicketRepository for TicketStore {
    async fn get_all(&self) -> Vec<Ticket> {
        match self.storage.read_collection(TICKETS_KEY).await {
            Ok(collection) => collection.decode_valid(TICKETS_KEY),
            Err(e) => {
                tracing::warn!("failed to load tickets: {}", e);
                Vec::new()
            }
        }
    }

    async fn get_by_id(&self, id: &TicketId) -> Option<Ticket> {
        self.get_all().await.into_iter().find(|t| &t.id == id)
    }

    async fn create(&self, new: NewTicket) -> Result<Ticket> {
        new.validate()?;

        let _guard = self.write_lock.lock().await;
        let Collection {
            revision,
            mut records,
        } = self.storage.read_collection(TICKETS_KEY).await?;

        let ticket = Ticket::from_new(new);
        records.push(serde_json::to_value(&ticket)?);
        self.save(revision, &records).await?;

        tracing::debug!(id = %ticket.id, "created ticket");
        Ok(ticket)
    }

    async fn update(&self, id: &TicketId, update: TicketUpdate) -> Result<Ticket> {
        update.validate()?;

        let _guard = self.write_lock.lock().await;
        let Collection {
            revision,
            mut records,
        } = self.storage.read_collection(TICKETS_KEY).await?;

        let record = records
            .iter_mut()
            .find(|r| record_id(r) == Some(id.as_str()))
            .ok_or_else(|| TicketAppError::TicketNotFound(id.to_string()))?;
        let mut ticket: Ticket = serde_json::from_value(record.clone())?;
        ticket.apply(update);

        let encoded = serde_json::to_value(&ticket)?;
        if let (Value::Object(stored), Value::Object(encoded)) = (record, encoded) {
            for key in EDITABLE_FIELDS {
                if let Some(value) = encoded.get(key) {
                    stored.insert(key.to_string(), value.clone());
                }
            }
        }

        self.save(revision, &records).await?;

        tracing::debug!(id = %id, "updated ticket");
        Ok(ticket)
    }

    async fn delete(&self, id: &TicketId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let Collection {
            revision,
            mut records,
        } = self.storage.read_collection(TICKETS_KEY).await?;

        let before = records.len();
        records.retain(|r| record_id(r) != Some(id.as_str()));
        if records.len() == before {
            tracing::debug!(id = %id, "delete of unknown ticket ignored");
            return Ok(());
        }

        self.save(revision, &records).await?;

        tracing::debug!(id = %id, "deleted ticket");
        Ok(())
    }
}
