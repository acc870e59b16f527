//! Entity mapping errors.

use std::fmt::Display;
use thiserror::Error;

/// Result type for entity mapping.
pub type Result<T> = std::result::Result<T, EntityError>;

/// Errors raised while flattening or rebuilding an entity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    /// A member's type has no property-map representation.
    #[error("Unsupported property type for '{property}': {type_name}")]
    UnsupportedPropertyType {
        /// Flattened property name of the member.
        property: String,
        /// Description of the rejected type.
        type_name: &'static str,
    },

    /// Two members flattened to the same property name.
    #[error("Duplicate property name: {0}")]
    DuplicateProperty(String),

    /// The root value is not a structured object.
    #[error("Not an entity: expected a struct, found {0}")]
    NotAnEntity(&'static str),

    /// A stored property does not fit the member it is read into.
    #[error("Property '{property}' holds {found}, expected {expected}")]
    TypeMismatch {
        /// Flattened property name.
        property: String,
        /// What the member needs.
        expected: &'static str,
        /// What the map holds.
        found: &'static str,
    },

    /// Error reported by a `Serialize` / `Deserialize` implementation.
    #[error("{0}")]
    Custom(String),
}

impl EntityError {
    /// Attach the property name to a serde-reported error.
    pub(crate) fn in_property(self, property: &str) -> Self {
        match self {
            Self::Custom(message) => Self::Custom(format!("property '{}': {}", property, message)),
            other => other,
        }
    }

    /// Check if this is an unsupported property type error.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedPropertyType { .. })
    }
}

impl serde::ser::Error for EntityError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl serde::de::Error for EntityError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}
