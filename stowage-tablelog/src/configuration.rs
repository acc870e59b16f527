//! Per-logger level switches.

use serde::{Deserialize, Serialize};

use crate::level::Level;

/// Level switches for one logger, stored as a table row keyed by the
/// logger name in both key positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LoggerConfiguration {
    /// Logger the switches apply to.
    pub logger_name: String,
    /// Emit trace entries.
    pub trace_enabled: bool,
    /// Emit debug entries.
    pub debug_enabled: bool,
    /// Emit info entries.
    pub info_enabled: bool,
    /// Emit warn entries.
    pub warn_enabled: bool,
    /// Emit error entries.
    pub error_enabled: bool,
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self {
            logger_name: String::new(),
            trace_enabled: true,
            debug_enabled: true,
            info_enabled: true,
            warn_enabled: true,
            error_enabled: true,
        }
    }
}

impl LoggerConfiguration {
    /// All levels enabled for `logger_name`.
    pub fn new(logger_name: impl Into<String>) -> Self {
        Self {
            logger_name: logger_name.into(),
            ..Self::default()
        }
    }

    /// Whether entries at `level` are written.
    pub fn is_enabled(&self, level: Level) -> bool {
        match level {
            Level::Trace => self.trace_enabled,
            Level::Debug => self.debug_enabled,
            Level::Info => self.info_enabled,
            Level::Warn => self.warn_enabled,
            Level::Error => self.error_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enables_every_level() {
        let config = LoggerConfiguration::new("orders");
        for level in Level::ALL {
            assert!(config.is_enabled(level));
        }
    }

    #[test]
    fn test_switches() {
        let config = LoggerConfiguration {
            debug_enabled: false,
            ..LoggerConfiguration::new("orders")
        };
        assert!(!config.is_enabled(Level::Debug));
        assert!(config.is_enabled(Level::Info));
    }
}
