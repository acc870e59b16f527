// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Environment variable loader
///
/// Keys are lower-cased; with a prefix, only matching variables are kept and
/// the prefix plus its separating underscore are stripped
/// (`STOWAGE_STORAGE` becomes `storage` under the `STOWAGE` prefix).
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load all environment variables
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    /// Filter and rename an arbitrary set of variables.
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            match self.prefix.as_deref() {
                Some(prefix) => {
                    if let Some(rest) = key.strip_prefix(prefix) {
                        let trimmed = rest.trim_start_matches('_');
                        if !trimmed.is_empty() {
                            config.insert(trimmed.to_lowercase(), value);
                        }
                    }
                }
                None => {
                    config.insert(key.to_lowercase(), value);
                }
            }
        }

        config
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    fn full_key(&self, key: &str) -> String {
        match self.prefix.as_deref() {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // std::env::set_var is unsafe in edition 2024, so prefix handling is
    // exercised through `collect` with synthetic variables.

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_collect_without_prefix_lowercases() {
        let loader = EnvLoader::new(None);
        let config = loader.collect(vars(&[("STORAGE", "UseDevelopmentStorage=true")]));

        assert_eq!(
            config.get("storage").map(String::as_str),
            Some("UseDevelopmentStorage=true")
        );
    }

    #[test]
    fn test_collect_with_prefix_filters_and_strips() {
        let loader = EnvLoader::new(Some("STOWAGE".to_string()));
        let config = loader.collect(vars(&[
            ("STOWAGE_STORAGE", "a"),
            ("STOWAGE_LOGS", "b"),
            ("OTHER_STORAGE", "c"),
            ("STOWAGE", "d"),
        ]));

        assert_eq!(config.len(), 2);
        assert_eq!(config.get("storage").map(String::as_str), Some("a"));
        assert_eq!(config.get("logs").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_env_loader_with_default() {
        let loader = EnvLoader::new(None);
        let value = loader.load_var_or("NONEXISTENT_VAR_12345", "default");

        assert_eq!(value, "default");
    }

    #[test]
    fn test_env_loader_missing_var() {
        let loader = EnvLoader::new(Some("STOWAGE_TEST".to_string()));
        assert!(loader.load_var("MISSING_VAR_67890").is_err());
    }

    #[test]
    fn test_full_key_applies_prefix() {
        let loader = EnvLoader::new(Some("MY_APP".to_string()));
        assert_eq!(loader.full_key("storage"), "MY_APP_STORAGE");
        assert_eq!(EnvLoader::default().full_key("storage"), "STORAGE");
    }
}
