//! Stored log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::LogContext;
use crate::level::Level;

/// One written log line.
///
/// Entries are partitioned by creation day and row-keyed by creation time
/// plus a random id, so rows sort chronologically within a day and never
/// collide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LogEntry {
    /// Random id, hex without dashes.
    pub entry_id: String,
    /// Creation time.
    #[serde(with = "stowage_entity::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Logger that wrote the entry.
    pub logger_name: String,
    /// Level name.
    pub level: String,
    /// Message text.
    pub message: String,
    /// Error chain and context collection notes.
    pub exception: Option<String>,
    /// Thread that wrote the entry.
    pub thread_id: Option<String>,
    /// Deployment id.
    pub deployment_id: Option<String>,
    /// Role name.
    pub role_name: Option<String>,
    /// Role instance.
    pub role_instance: Option<String>,
    /// Host name.
    pub machine_name: Option<String>,
}

impl LogEntry {
    /// New entry stamped with the current time.
    pub fn new(logger_name: &str, level: Level, message: &str) -> Self {
        Self {
            entry_id: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
            logger_name: logger_name.to_string(),
            level: level.as_str().to_string(),
            message: message.to_string(),
            ..Self::default()
        }
    }

    /// Creation day as `YYYYMMDD`.
    pub fn partition_key(&self) -> String {
        self.created_at.format("%Y%m%d").to_string()
    }

    /// Zero-padded creation time in microseconds, a dash and the entry id.
    pub fn row_key(&self) -> String {
        format!("{:019}-{}", self.created_at.timestamp_micros(), self.entry_id)
    }

    /// Copy context fields onto the entry.
    pub fn apply_context(&mut self, context: LogContext) {
        self.thread_id = context.thread_id;
        self.deployment_id = context.deployment_id;
        self.role_name = context.role_name;
        self.role_instance = context.role_instance;
        self.machine_name = context.machine_name;
    }

    /// Append a line to the exception field.
    pub fn append_exception(&mut self, line: &str) {
        match &mut self.exception {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(line);
            }
            None => self.exception = Some(line.to_string()),
        }
    }
}

/// Render an error and its sources, one per line.
pub(crate) fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
