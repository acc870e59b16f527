//! Start-up assembly of the settings that hold connection strings.

use crate::{ConfigManager, FileFormat, Result};
use std::path::PathBuf;

#[derive(Debug)]
enum Source {
    Environment,
    DotEnv(Option<PathBuf>),
    File(PathBuf, Option<FileFormat>),
}

/// Collects the settings sources of a process and loads them in one go.
///
/// Sources are applied in the order they were added, so a later source
/// overrides keys an earlier one set. Connections added with
/// [`SettingsBuilder::connection`] are applied last and always win.
///
/// ```
/// use stowage_config::SettingsBuilder;
///
/// let settings = SettingsBuilder::new()
///     .connection("Storage", "UseDevelopmentStorage=true")
///     .build()
///     .unwrap();
/// assert!(settings.has("storage"));
/// ```
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    prefix: Option<String>,
    sources: Vec<Source>,
    connections: Vec<(String, String)>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only read environment variables starting with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Read the process environment.
    pub fn environment(mut self) -> Self {
        self.sources.push(Source::Environment);
        self
    }

    /// Load a `.env` file into the process, then read the environment.
    /// Without a path, a missing `./.env` is not an error.
    pub fn dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.sources.push(Source::DotEnv(path));
        self
    }

    /// Read a settings file, its format detected from the extension.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File(path.into(), None));
        self
    }

    /// Read a settings file in an explicit format.
    pub fn file_as(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.sources.push(Source::File(path.into(), Some(format)));
        self
    }

    /// Set a connection string directly.
    pub fn connection(
        mut self,
        name: impl Into<String>,
        connection_string: impl Into<String>,
    ) -> Self {
        self.connections
            .push((name.into(), connection_string.into()));
        self
    }

    /// Load every source into a new [`ConfigManager`].
    pub fn build(self) -> Result<ConfigManager> {
        let settings = match self.prefix {
            Some(prefix) => ConfigManager::with_prefix(prefix),
            None => ConfigManager::new(),
        };

        for source in self.sources {
            match source {
                Source::Environment => settings.load_env()?,
                Source::DotEnv(path) => settings.load_dotenv(path.as_deref())?,
                Source::File(path, format) => {
                    let format = match format {
                        Some(format) => format,
                        None => FileFormat::detect(&path)?,
                    };
                    settings.load_file(&path, format)?;
                }
            }
        }

        for (name, connection_string) in self.connections {
            settings.set(&name, connection_string)?;
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.toml");
        let local = dir.path().join("local.json");
        std::fs::write(&base, "storage = \"AccountName=base\"\nlogs = \"AccountName=logs\"\n").unwrap();
        std::fs::write(&local, r#"{"storage": "AccountName=local"}"#).unwrap();

        let settings = SettingsBuilder::new().file(&base).file(&local).build().unwrap();

        assert_eq!(settings.get_string("storage").unwrap(), "AccountName=local");
        assert_eq!(settings.get_string("logs").unwrap(), "AccountName=logs");
    }

    #[test]
    fn test_explicit_connection_wins_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.conf");
        std::fs::write(&path, "STORAGE=AccountName=file\n").unwrap();

        let settings = SettingsBuilder::new()
            .connection("Storage", "UseDevelopmentStorage=true")
            .file_as(&path, FileFormat::Env)
            .build()
            .unwrap();

        assert_eq!(settings.get_string("storage").unwrap(), "UseDevelopmentStorage=true");
    }

    #[test]
    fn test_missing_or_unknown_files_fail() {
        assert!(SettingsBuilder::new().file("/definitely/not/here.json").build().is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ini");
        std::fs::write(&path, "storage=x").unwrap();
        assert!(SettingsBuilder::new().file(&path).build().is_err());
    }
}
