use crate::{
    error::{Result, TicketAppError},
    storage::{Collection, Revision, Storage},
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::{path::Path, sync::Mutex};

/// SQLite-backed storage keeping each collection as one row
pub struct SqliteStorage {
    connection: Mutex<Connection>,
}

impl SqliteStorage {
    const SCHEMA: &'static str = "CREATE TABLE IF NOT EXISTS collections (
        key TEXT PRIMARY KEY,
        revision INTEGER NOT NULL,
        body TEXT NOT NULL
    )";

    /// Opens (or creates) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> Result<Self> {
        connection.execute(Self::SCHEMA, [])?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let connection = self
            .connection
            .lock()
            .map_err(|e| TicketAppError::StorageError(format!("Lock poisoned: {}", e)))?;
        f(&connection)
    }
}

fn to_revision(value: i64) -> Revision {
    Revision::new(u64::try_from(value).unwrap_or_default())
}

fn to_sql_revision(revision: Revision) -> Result<i64> {
    i64::try_from(revision.value())
        .map_err(|_| TicketAppError::StorageError(format!("Revision out of range: {:?}", revision)))
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(Self::SCHEMA, [])?;
            Ok(())
        })
    }

    async fn is_initialized(&self) -> bool {
        self.with_connection(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'collections')",
                [],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .unwrap_or(false)
    }

    async fn read_collection(&self, key: &str) -> Result<Collection> {
        let row = self.with_connection(|conn| {
            let row = conn
                .query_row(
                    "SELECT revision, body FROM collections WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;
            Ok(row)
        })?;

        let Some((revision, body)) = row else {
            return Ok(Collection::default());
        };

        let records: Vec<Value> = serde_json::from_str(&body)?;
        Ok(Collection {
            revision: to_revision(revision),
            records,
        })
    }

    async fn write_collection(
        &self,
        key: &str,
        expected: Revision,
        records: &[Value],
    ) -> Result<Revision> {
        let body = serde_json::to_string(records)?;
        let expected_sql = to_sql_revision(expected)?;

        self.with_connection(|conn| {
            let changed = if expected.is_absent() {
                conn.execute(
                    "INSERT INTO collections (key, revision, body) VALUES (?1, 1, ?2)
                     ON CONFLICT (key) DO NOTHING",
                    params![key, body],
                )?
            } else {
                conn.execute(
                    "UPDATE collections SET revision = revision + 1, body = ?2
                     WHERE key = ?1 AND revision = ?3",
                    params![key, body, expected_sql],
                )?
            };

            if changed == 0 {
                return Err(TicketAppError::Conflict {
                    key: key.to_string(),
                });
            }
            Ok(Revision::new(expected.value() + 1))
        })
    }
}
