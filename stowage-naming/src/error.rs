//! Naming error types.

use std::fmt;
use thiserror::Error;

/// Result type for name canonicalization.
pub type Result<T> = std::result::Result<T, NamingError>;

/// Which family of identifier a name was canonicalized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameClass {
    /// Queue name.
    Queue,
    /// Table name.
    Table,
    /// Blob container name.
    Container,
    /// Slash-delimited blob name.
    BlobPath,
    /// Partition or row key.
    Key,
}

impl fmt::Display for NameClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NameClass::Queue => "queue",
            NameClass::Table => "table",
            NameClass::Container => "container",
            NameClass::BlobPath => "blob",
            NameClass::Key => "key",
        })
    }
}

/// Canonicalization errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    /// The input cannot be turned into a valid name under the active rules.
    #[error("Invalid {class} name {name:?}: {reason}")]
    InvalidName {
        /// Identifier family.
        class: NameClass,
        /// The raw input.
        name: String,
        /// Which rule rejected it.
        reason: String,
    },
}

impl NamingError {
    pub(crate) fn invalid(class: NameClass, name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            class,
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// The identifier family that was being canonicalized.
    pub fn class(&self) -> NameClass {
        match self {
            Self::InvalidName { class, .. } => *class,
        }
    }
}
