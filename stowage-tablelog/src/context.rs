//! Ambient process context attached to every log entry.

use std::env::{self, VarError};

use crate::{Result, TableLogError};

/// Deployment and thread identifiers for a log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogContext {
    /// Current thread.
    pub thread_id: Option<String>,
    /// Deployment the process belongs to.
    pub deployment_id: Option<String>,
    /// Role within the deployment.
    pub role_name: Option<String>,
    /// Instance of the role.
    pub role_instance: Option<String>,
    /// Host name.
    pub machine_name: Option<String>,
}

/// Source of [`LogContext`].
///
/// A provider fills in what it can and reports what it could not. Failures
/// are recorded on the entry and never stop it from being written.
pub trait ContextProvider: Send + Sync {
    /// Fill `context` for the entry being written.
    ///
    /// Fields set before an error is returned are kept.
    fn collect(&self, context: &mut LogContext) -> Result<()>;
}

/// Reads the context from the current thread and the process environment.
///
/// | Field | Source |
/// |-------|--------|
/// | thread id | `std::thread::current()` |
/// | deployment id | `STOWAGE_DEPLOYMENT_ID` |
/// | role name | `STOWAGE_ROLE_NAME` |
/// | role instance | `STOWAGE_ROLE_INSTANCE` |
/// | machine name | `HOSTNAME`, then `COMPUTERNAME` |
///
/// A variable that is not valid unicode leaves its field empty; the other
/// fields are still collected.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentContext;

impl ContextProvider for EnvironmentContext {
    fn collect(&self, context: &mut LogContext) -> Result<()> {
        collect_with(context, |key| env::var(key))
    }
}

fn collect_with<F>(context: &mut LogContext, lookup: F) -> Result<()>
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    let mut unreadable = Vec::new();
    let mut read = |key: &'static str| match lookup(key) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(_)) => {
            unreadable.push(key);
            None
        }
    };

    context.thread_id = Some(format!("{:?}", std::thread::current().id()));
    context.deployment_id = read("STOWAGE_DEPLOYMENT_ID");
    context.role_name = read("STOWAGE_ROLE_NAME");
    context.role_instance = read("STOWAGE_ROLE_INSTANCE");
    context.machine_name = read("HOSTNAME").or_else(|| read("COMPUTERNAME"));

    if unreadable.is_empty() {
        Ok(())
    } else {
        Err(TableLogError::Context(format!(
            "environment variables not valid unicode: {}",
            unreadable.join(", ")
        )))
    }
}
