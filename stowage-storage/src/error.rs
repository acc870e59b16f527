//! Storage error types.

use stowage_config::ConfigError;
use stowage_entity::EntityError;
use stowage_naming::NamingError;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage proxy errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A resource name or key could not be canonicalized.
    #[error(transparent)]
    InvalidName(#[from] NamingError),

    /// An entity could not be mapped to or from a property map.
    #[error("Entity mapping error: {0}")]
    Entity(#[from] EntityError),

    /// Operation attempted before the connection was configured.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Insert collided with an existing record.
    #[error("Duplicate key: ({partition_key}, {row_key})")]
    DuplicateKey {
        /// Partition key of the existing record.
        partition_key: String,
        /// Row key of the existing record.
        row_key: String,
    },

    /// A queue payload could not be decoded.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Connection string could not be parsed.
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// Payload encoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure reported by the storage service.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Settings store error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl StorageError {
    /// Check if this is a not configured error.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }

    /// Check if this is a duplicate key error.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    /// Check if this is an invalid name error.
    pub fn is_invalid_name(&self) -> bool {
        matches!(self, Self::InvalidName(_))
    }

    /// Check if this is a malformed message error.
    pub fn is_malformed_message(&self) -> bool {
        matches!(self, Self::MalformedMessage(_))
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for StorageError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
