use crate::error::{Result, TicketAppError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Which persistence adapter backs the stores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
    #[serde(default = "default_true")]
    pub seed_samples: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            sqlite_path: default_sqlite_path(),
            seed_samples: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token signing secret. A random one is generated per process when unset.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_hours: default_ttl_hours(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("data/ticketapp.db")
}

fn default_ttl_hours() -> u64 {
    24
}

impl AppConfig {
    /// Parses configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| TicketAppError::ConfigError(e.to_string()))
    }

    /// Loads configuration from a file; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            TicketAppError::ConfigError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Configuration for a throwaway in-memory instance
    pub fn in_memory() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert!(config.storage.seed_samples);
        assert_eq!(config.session.ttl_hours, 24);
        assert!(config.session.secret.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [storage]
            backend = "memory"
            seed_samples = false

            [session]
            secret = "s3cret"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(!config.storage.seed_samples);
        assert_eq!(config.storage.data_dir, PathBuf::from("data"));
        assert_eq!(config.session.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.session.ttl_hours, 24);
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let err = AppConfig::from_toml_str("[storage]\nbackend = \"indexeddb\"\n").unwrap_err();
        assert!(matches!(err, TicketAppError::ConfigError(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nttl_hours = 2\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.session.ttl_hours, 2);
    }
}
