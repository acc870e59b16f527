//! Table logger errors.

use stowage_storage::StorageError;
use thiserror::Error;

/// Result type for table logger operations.
pub type Result<T> = std::result::Result<T, TableLogError>;

/// Table logger errors.
#[derive(Debug, Error)]
pub enum TableLogError {
    /// Reading configuration or writing an entry failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Ambient context could not be collected.
    #[error("{0}")]
    Context(String),

    /// A level name that is not one of trace, debug, info, warn, error.
    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}
