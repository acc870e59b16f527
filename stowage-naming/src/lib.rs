//! Identifier canonicalization for cloud storage resources.
//!
//! The storage service is strict about names: queue and table names are
//! short lowercase alphanumerics, container names additionally allow single
//! dashes, blob names are slash-delimited paths and table keys forbid a few
//! characters. Callers hand in whatever name they have; these functions
//! either return the canonical form or fail with
//! [`NamingError::InvalidName`]. Every function is idempotent on its own
//! output.
//!
//! - [`normalize_flat_identifier`] - queue, table and container names
//! - [`normalize_hierarchical_path`] - blob names, lenient or strict
//! - [`normalize_key`] - partition and row keys

mod error;
mod flat;
mod key;
mod path;

pub use error::{NameClass, NamingError, Result};
pub use flat::{
    IdentifierKind, MAX_FLAT_LEN, MIN_FLAT_LEN, is_valid_flat_identifier, normalize_flat_identifier,
};
pub use key::{MAX_KEY_LEN, normalize_key};
pub use path::{MAX_BLOB_NAME_LEN, normalize_hierarchical_path};
