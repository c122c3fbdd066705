use thiserror::Error;

pub type Result<T> = std::result::Result<T, TicketAppError>;

#[derive(Debug, Error)]
pub enum TicketAppError {
    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Collection '{key}' was modified concurrently")]
    Conflict { key: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "sqlite-storage")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Session token error: {0}")]
    TokenError(String),

    #[error("Password hashing error: {0}")]
    PasswordHashError(String),
}

/// Coarse classification callers use to pick a user-facing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    DuplicateAccount,
    InvalidCredentials,
    Conflict,
    Storage,
    Config,
}

impl TicketAppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::TicketNotFound(_) => ErrorKind::NotFound,
            Self::DuplicateAccount(_) => ErrorKind::DuplicateAccount,
            // A token that fails to verify is treated like a failed login
            Self::InvalidCredentials | Self::TokenError(_) => ErrorKind::InvalidCredentials,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::StorageError(_)
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::PasswordHashError(_) => ErrorKind::Storage,
            #[cfg(feature = "sqlite-storage")]
            Self::SqliteError(_) => ErrorKind::Storage,
            Self::ConfigError(_) => ErrorKind::Config,
        }
    }
}
