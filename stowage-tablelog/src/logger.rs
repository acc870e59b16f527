//! Table-backed logger with a cached level configuration.

use parking_lot::Mutex;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use stowage_naming::normalize_key;
use stowage_storage::{StorageEnvironment, TableProxy};
use tokio::time::Instant;

use crate::configuration::LoggerConfiguration;
use crate::context::{ContextProvider, EnvironmentContext, LogContext};
use crate::entry::{LogEntry, error_chain};
use crate::level::Level;
use crate::{Result, StorageError};

/// Default table holding [`LoggerConfiguration`] rows.
pub const DEFAULT_CONFIGURATION_TABLE: &str = "logconfiguration";

/// Default table receiving [`LogEntry`] rows.
pub const DEFAULT_ENTRY_TABLE: &str = "logentries";

/// How long a loaded configuration is trusted before it is read again.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CachedConfiguration {
    record: Arc<LoggerConfiguration>,
    loaded_at: Instant,
}

/// Writes log entries to a table, filtered by a per-logger configuration
/// row that is cached for [`DEFAULT_CACHE_TTL`].
///
/// When no configuration row exists yet, an all-levels-enabled one is
/// written so other processes pick up the same default.
pub struct TableLogger {
    name: String,
    configurations: TableProxy<LoggerConfiguration>,
    entries: TableProxy<LogEntry>,
    context: Arc<dyn ContextProvider>,
    cache_ttl: Duration,
    cached: Mutex<Option<CachedConfiguration>>,
}

impl TableLogger {
    /// Create a logger writing through `connection_name`.
    pub fn new(
        environment: StorageEnvironment,
        connection_name: impl Into<String>,
        logger_name: impl Into<String>,
    ) -> Result<Self> {
        let name = logger_name.into();
        normalize_key(&name).map_err(StorageError::from)?;
        let connection_name = connection_name.into();

        let configurations = TableProxy::new(
            environment.clone(),
            |c: &LoggerConfiguration| c.logger_name.clone(),
            |c: &LoggerConfiguration| c.logger_name.clone(),
        )?
        .with_table_name(DEFAULT_CONFIGURATION_TABLE)?
        .with_connection_name(connection_name.clone());

        let entries = TableProxy::new(environment, LogEntry::partition_key, LogEntry::row_key)?
            .with_table_name(DEFAULT_ENTRY_TABLE)?
            .with_connection_name(connection_name);

        Ok(Self {
            name,
            configurations,
            entries,
            context: Arc::new(EnvironmentContext),
            cache_ttl: DEFAULT_CACHE_TTL,
            cached: Mutex::new(None),
        })
    }

    /// Read configuration rows from another table.
    pub fn with_configuration_table(mut self, table: &str) -> Result<Self> {
        self.configurations.set_table_name(table)?;
        self.invalidate();
        Ok(self)
    }

    /// Write entries to another table.
    pub fn with_entry_table(mut self, table: &str) -> Result<Self> {
        self.entries.set_table_name(table)?;
        Ok(self)
    }

    /// Trust a loaded configuration for `ttl`.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Collect entry context from `provider`.
    pub fn with_context_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.context = Arc::new(provider);
        self
    }

    /// Logger name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forget the cached configuration.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }

    /// Current configuration, from cache while it is fresh.
    pub async fn configuration(&self) -> Result<Arc<LoggerConfiguration>> {
        if let Some(record) = self.fresh_configuration() {
            return Ok(record);
        }

        let record = Arc::new(self.load_or_initialize().await?);
        *self.cached.lock() = Some(CachedConfiguration {
            record: record.clone(),
            loaded_at: Instant::now(),
        });
        Ok(record)
    }

    /// Whether entries at `level` would be written.
    pub async fn is_enabled(&self, level: Level) -> Result<bool> {
        Ok(self.configuration().await?.is_enabled(level))
    }

    /// Write an entry if `level` is enabled. Returns whether one was written.
    ///
    /// A failure to collect the entry context is noted in the entry's
    /// exception field; the entry is still written with whatever context
    /// was collected.
    pub async fn log(
        &self,
        level: Level,
        message: &str,
        error: Option<&(dyn Error + Send + Sync + 'static)>,
    ) -> Result<bool> {
        if !self.is_enabled(level).await? {
            return Ok(false);
        }

        let mut entry = LogEntry::new(&self.name, level, message);
        if let Some(error) = error {
            entry.append_exception(&error_chain(error));
        }
        let mut context = LogContext::default();
        let collected = self.context.collect(&mut context);
        entry.apply_context(context);
        if let Err(e) = collected {
            warn!(logger = %self.name, error = %e, "Could not collect logging context");
            entry.append_exception(&format!("Failed to collect logging context: {}", e));
        }

        self.entries.insert(&entry).await?;
        Ok(true)
    }

    /// Log at trace level.
    pub async fn trace(&self, message: &str) -> Result<bool> {
        self.log(Level::Trace, message, None).await
    }

    /// Log at debug level.
    pub async fn debug(&self, message: &str) -> Result<bool> {
        self.log(Level::Debug, message, None).await
    }

    /// Log at info level.
    pub async fn info(&self, message: &str) -> Result<bool> {
        self.log(Level::Info, message, None).await
    }

    /// Log at warn level.
    pub async fn warn(&self, message: &str) -> Result<bool> {
        self.log(Level::Warn, message, None).await
    }

    /// Log at error level with an optional cause.
    pub async fn error(
        &self,
        message: &str,
        error: Option<&(dyn Error + Send + Sync + 'static)>,
    ) -> Result<bool> {
        self.log(Level::Error, message, error).await
    }

    fn fresh_configuration(&self) -> Option<Arc<LoggerConfiguration>> {
        let cached = self.cached.lock();
        cached
            .as_ref()
            .filter(|c| c.loaded_at.elapsed() < self.cache_ttl)
            .map(|c| c.record.clone())
    }

    async fn load_or_initialize(&self) -> Result<LoggerConfiguration> {
        debug!(logger = %self.name, "Loading logger configuration");
        if let Some(record) = self.configurations.get(&self.name, &self.name).await? {
            return Ok(record);
        }

        let record = LoggerConfiguration::new(self.name.clone());
        self.configurations.insert_or_update(&record).await?;
        info!(logger = %self.name, "Created default logger configuration");
        Ok(record)
    }
}

impl fmt::Debug for TableLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableLogger")
            .field("name", &self.name)
            .field("configurations", &self.configurations)
            .field("entries", &self.entries)
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}
