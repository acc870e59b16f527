//! Resolution of connection names to storage accounts.

use std::fmt;
use std::sync::Arc;
use stowage_config::{ConfigManager, SettingsBuilder};

use crate::backend::{AccountFactory, StorageAccount};
use crate::memory::MemoryAccountFactory;
use crate::{Result, StorageConnection, StorageError};

/// Settings plus the factory that turns them into account clients.
///
/// A connection name is a settings key whose value is a connection string.
/// Cloning is cheap and clones share both the settings and the factory.
#[derive(Clone)]
pub struct StorageEnvironment {
    settings: ConfigManager,
    factory: Arc<dyn AccountFactory>,
}

impl StorageEnvironment {
    /// Create an environment.
    pub fn new(settings: ConfigManager, factory: Arc<dyn AccountFactory>) -> Self {
        Self { settings, factory }
    }

    /// Load settings from their start-up sources and bind them to `factory`.
    pub fn from_settings(
        settings: SettingsBuilder,
        factory: Arc<dyn AccountFactory>,
    ) -> Result<Self> {
        Ok(Self::new(settings.build()?, factory))
    }

    /// Environment backed by an in-memory emulator.
    pub fn in_memory(settings: ConfigManager, factory: &MemoryAccountFactory) -> Self {
        Self::new(settings, Arc::new(factory.clone()))
    }

    /// Settings store.
    pub fn settings(&self) -> &ConfigManager {
        &self.settings
    }

    /// Parse the connection string stored under `connection_name`.
    pub fn connection(&self, connection_name: &str) -> Result<StorageConnection> {
        match self.settings.get_string(connection_name) {
            Ok(raw) => StorageConnection::parse(&raw),
            Err(e) if e.is_missing() => Err(StorageError::NotConfigured(format!(
                "connection setting '{}' is not set",
                connection_name
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Connect to the account named by `connection_name`.
    pub async fn connect(&self, connection_name: &str) -> Result<Arc<dyn StorageAccount>> {
        let connection = self.connection(connection_name)?;
        self.factory.connect(&connection).await
    }
}

impl fmt::Debug for StorageEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageEnvironment")
            .field("settings", &self.settings.keys())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_setting_is_not_configured() {
        let factory = MemoryAccountFactory::new();
        let env = StorageEnvironment::in_memory(ConfigManager::new(), &factory);

        let err = env.connect("Storage").await.err().unwrap();
        assert!(err.is_not_configured());
        assert_eq!(factory.stats().connects(), 0);
    }

    #[tokio::test]
    async fn test_connects_with_stored_string() {
        let settings = ConfigManager::new();
        settings.set("Storage", "UseDevelopmentStorage=true").unwrap();
        let factory = MemoryAccountFactory::new();
        let env = StorageEnvironment::in_memory(settings, &factory);

        let account = env.connect("Storage").await.unwrap();
        assert_eq!(account.name(), StorageConnection::DEVELOPMENT_ACCOUNT);
        assert_eq!(factory.stats().connects(), 1);
    }

    #[tokio::test]
    async fn test_from_settings_resolves_connections() {
        let factory = MemoryAccountFactory::new();
        let settings = SettingsBuilder::new()
            .connection("Storage", "UseDevelopmentStorage=true")
            .connection("Archive", "AccountName=archive;AccountKey=a2V5");
        let env = StorageEnvironment::from_settings(settings, Arc::new(factory.clone())).unwrap();

        assert_eq!(env.connect("Archive").await.unwrap().name(), "archive");
        assert!(env.connection("Storage").unwrap().is_development());
        assert!(env.connection("Missing").unwrap_err().is_not_configured());
    }

    #[test]
    fn test_from_settings_surfaces_load_errors() {
        let settings = SettingsBuilder::new().file("/definitely/not/here.toml");
        let result = StorageEnvironment::from_settings(settings, Arc::new(MemoryAccountFactory::new()));
        assert!(matches!(result, Err(StorageError::Config(_))));
    }

    #[test]
    fn test_bad_string_surfaces_parse_error() {
        let settings = ConfigManager::new();
        settings.set("Storage", "AccountKey=abc").unwrap();
        let env = StorageEnvironment::in_memory(settings, &MemoryAccountFactory::new());

        assert!(matches!(
            env.connection("Storage"),
            Err(StorageError::InvalidConnectionString(_))
        ));
    }
}
