//! Settings management for Stowage.
//!
//! Storage proxies are configured with *connection names*; the connection
//! string behind a name is a setting resolved here, from the process
//! environment, a `.env` file or a JSON / TOML / env-format file.
//!
//! ```
//! use stowage_config::ConfigManager;
//!
//! let settings = ConfigManager::new();
//! settings.set("Storage", "UseDevelopmentStorage=true").unwrap();
//!
//! // keys are case-insensitive
//! assert_eq!(settings.get_string("storage").unwrap(), "UseDevelopmentStorage=true");
//! ```

pub mod builder;
pub mod env;
pub mod error;
pub mod loader;

pub use builder::SettingsBuilder;
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Thread-safe settings store shared by every proxy of a process.
///
/// Keys are stored lower-cased. A dotted key (`connections.storage`) that is
/// not present verbatim is resolved by walking nested tables loaded from
/// files.
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;

        let mut config = self.config.write();
        for (key, value) in env_vars {
            config.insert(key, Value::String(value));
        }

        Ok(())
    }

    /// Load configuration from a .env file, then from the environment
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                // a missing default .env is not an error
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let map = ConfigLoader::new(format).load_file(path)?;
        self.extend(map);
        Ok(())
    }

    /// Load settings from an in-memory document.
    pub fn load_str(&self, content: &str, format: FileFormat) -> Result<()> {
        let map = ConfigLoader::new(format).parse(content)?;
        self.extend(map);
        Ok(())
    }

    fn extend(&self, map: serde_json::Map<String, Value>) {
        let mut config = self.config.write();
        for (key, value) in map {
            config.insert(key.to_lowercase(), value);
        }
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        self.config.write().insert(key.to_lowercase(), json_value);
        Ok(())
    }

    /// Remove a value, returning whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.config.write().remove(&key.to_lowercase()).is_some()
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let key = key.to_lowercase();
        let config = self.config.read();

        if let Some(value) = config.get(&key) {
            return Some(value.clone());
        }

        let mut segments = key.split('.');
        let mut current = config.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(segment))
                    .map(|(_, v)| v)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value).map_err(|e| ConfigError::DeserializationError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Get an integer value
    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    /// Get a boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Get all top-level configuration keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.config.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Merge configuration from another manager; `other` wins on conflicts.
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.config, &other.config) {
            return;
        }
        let snapshot = other.config.read().clone();
        self.config.write().extend(snapshot);
    }
}
