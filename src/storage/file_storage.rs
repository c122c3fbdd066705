use crate::{
    error::{Result, TicketAppError},
    storage::{Collection, Revision, Storage},
};
use async_trait::async_trait;
use fs2::FileExt;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};
use tokio::{fs, sync::Mutex};
use uuid::Uuid;

/// Exclusive advisory lock on a collection's `<key>.lock` sidecar.
/// Every `FileStorage`, in this process or another, takes it around the
/// compare and the rename. Released on drop.
struct CollectionLock {
    file: File,
}

impl CollectionLock {
    async fn acquire(path: PathBuf) -> Result<Self> {
        tokio::task::spawn_blocking(move || -> Result<Self> {
            let file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(Self { file })
        })
        .await
        .map_err(|e| TicketAppError::StorageError(format!("lock task failed: {}", e)))?
    }
}

impl Drop for CollectionLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// File-based storage: one pretty-printed JSON array per collection
pub struct FileStorage {
    root_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    const EXTENSION: &'static str = "json";
    const LOCK_EXTENSION: &'static str = "lock";

    /// Creates a new FileStorage rooted at the given data directory
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root_path: data_dir.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn collection_file(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(TicketAppError::StorageError(format!(
                "Invalid collection key: {:?}",
                key
            )));
        }
        Ok(self.root_path.join(format!("{}.{}", key, Self::EXTENSION)))
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }

    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Content-derived revision, so writers in other processes are noticed too
    fn revision_of(bytes: &[u8]) -> Revision {
        let digest = Sha256::digest(bytes);
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        // 0 is reserved for absent collections
        Revision::new(u64::from_be_bytes(prefix).max(1))
    }

    fn parse_records(key: &str, bytes: &[u8]) -> Result<Vec<Value>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Array(records) => Ok(records),
            Value::Null => Ok(Vec::new()),
            _ => Err(TicketAppError::StorageError(format!(
                "Collection '{}' is not a JSON array",
                key
            ))),
        }
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn initialize(&self) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await
    }

    async fn is_initialized(&self) -> bool {
        self.root_path.is_dir()
    }

    async fn read_collection(&self, key: &str) -> Result<Collection> {
        let path = self.collection_file(key)?;
        let Some(bytes) = Self::read_bytes(&path).await? else {
            return Ok(Collection::default());
        };

        Ok(Collection {
            revision: Self::revision_of(&bytes),
            records: Self::parse_records(key, &bytes)?,
        })
    }

    async fn write_collection(
        &self,
        key: &str,
        expected: Revision,
        records: &[Value],
    ) -> Result<Revision> {
        let path = self.collection_file(key)?;
        let _guard = self.write_lock.lock().await;
        self.ensure_directory_exists(&self.root_path).await?;
        let _lock = CollectionLock::acquire(path.with_extension(Self::LOCK_EXTENSION)).await?;

        let current = Self::read_bytes(&path)
            .await?
            .map(|bytes| Self::revision_of(&bytes))
            .unwrap_or(Revision::ABSENT);
        if current != expected {
            return Err(TicketAppError::Conflict {
                key: key.to_string(),
            });
        }

        let json = serde_json::to_string_pretty(records)?;
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&temp_path, json.as_bytes()).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(Self::revision_of(json.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_storage_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("data"));

        assert!(!storage.is_initialized().await);

        storage.initialize().await.unwrap();

        assert!(storage.is_initialized().await);
        assert!(storage.root_path().exists());
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let collection = storage.read_collection("tickets").await.unwrap();
        assert!(collection.records.is_empty());
        assert!(collection.revision.is_absent());
    }

    #[tokio::test]
    async fn test_write_and_read_collection() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        storage.initialize().await.unwrap();

        let records = vec![json!({"id": "1"}), json!({"id": "2"})];
        let rev = storage
            .write_collection("tickets", Revision::ABSENT, &records)
            .await
            .unwrap();

        let loaded = storage.read_collection("tickets").await.unwrap();
        assert_eq!(loaded.records, records);
        assert_eq!(loaded.revision, rev);
        assert!(!rev.is_absent());
    }

    #[tokio::test]
    async fn test_file_is_a_pretty_json_array() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        storage
            .write_collection("tickets", Revision::ABSENT, &[json!({"id": "1"})])
            .await
            .unwrap();

        let contents = std::fs::read_to_string(temp_dir.path().join("tickets.json")).unwrap();
        assert!(contents.starts_with('['));
        assert!(contents.contains('\n'));
        let leftovers = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_independent_instances_cannot_both_win() {
        let temp_dir = TempDir::new().unwrap();
        let a = Arc::new(FileStorage::new(temp_dir.path()));
        let b = Arc::new(FileStorage::new(temp_dir.path()));

        for round in 0..20 {
            let key = format!("race{}", round);
            let writers: Vec<_> = [(a.clone(), "a"), (b.clone(), "b")]
                .into_iter()
                .map(|(storage, id)| {
                    let key = key.clone();
                    tokio::spawn(async move {
                        storage
                            .write_collection(&key, Revision::ABSENT, &[json!({ "id": id })])
                            .await
                    })
                })
                .collect();

            let mut winners = 0;
            for writer in writers {
                match writer.await.unwrap() {
                    Ok(_) => winners += 1,
                    Err(e) => assert!(matches!(e, TicketAppError::Conflict { .. }), "{}", e),
                }
            }
            assert_eq!(winners, 1, "round {}", round);
        }
    }

    #[tokio::test]
    async fn test_external_modification_is_a_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let rev = storage
            .write_collection("tickets", Revision::ABSENT, &[json!({"id": "1"})])
            .await
            .unwrap();

        // Another process rewrites the file behind our back
        std::fs::write(temp_dir.path().join("tickets.json"), r#"[{"id": "other"}]"#).unwrap();

        let err = storage
            .write_collection("tickets", rev, &[json!({"id": "2"})])
            .await
            .unwrap_err();
        assert!(matches!(err, TicketAppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_absent_expectation_conflicts_with_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("tickets.json"), "[]").unwrap();

        let err = storage
            .write_collection("tickets", Revision::ABSENT, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TicketAppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_empty_and_null_files_read_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        std::fs::write(temp_dir.path().join("a.json"), "").unwrap();
        std::fs::write(temp_dir.path().join("b.json"), "null").unwrap();

        let a = storage.read_collection("a").await.unwrap();
        assert!(a.records.is_empty());
        assert!(!a.revision.is_absent());
        assert!(storage.read_collection("b").await.unwrap().records.is_empty());
    }

    #[tokio::test]
    async fn test_non_array_document_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("tickets.json"), r#"{"id": "1"}"#).unwrap();

        let err = storage.read_collection("tickets").await.unwrap_err();
        assert!(matches!(err, TicketAppError::StorageError(_)));
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert!(storage.read_collection("../escape").await.is_err());
        assert!(storage.read_collection("").await.is_err());
    }
}
