//! Log sink that writes entries to table storage.
//!
//! Whether a level is written is decided per logger by a
//! [`LoggerConfiguration`] row in a configuration table. The row is cached
//! for five minutes; if it does not exist a default with every level enabled
//! is created. Each entry is flattened into its own row, partitioned by day.
//!
//! ```no_run
//! use stowage_tablelog::TableLogger;
//! # async fn example(env: stowage_storage::StorageEnvironment) -> stowage_tablelog::Result<()> {
//! let logger = TableLogger::new(env, "Diagnostics", "billing")?;
//! logger.info("invoice run started").await?;
//! # Ok(())
//! # }
//! ```

mod configuration;
mod context;
mod entry;
mod error;
mod level;
mod logger;

pub use configuration::LoggerConfiguration;
pub use context::{ContextProvider, EnvironmentContext, LogContext};
pub use entry::LogEntry;
pub use error::{Result, TableLogError};
pub use level::Level;
pub use logger::{DEFAULT_CACHE_TTL, DEFAULT_CONFIGURATION_TABLE, DEFAULT_ENTRY_TABLE, TableLogger};
pub use stowage_storage::StorageError;
