//! Flat identifiers: queue, table and container names.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{NameClass, NamingError, Result};

/// Shortest accepted flat identifier.
pub const MIN_FLAT_LEN: usize = 3;
/// Longest accepted flat identifier.
pub const MAX_FLAT_LEN: usize = 63;

static NOT_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());

static NOT_ALPHANUMERIC_OR_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9-]").unwrap());

static REPEATED_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

static FLAT_GRAMMAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9]|-[a-z0-9])*$").unwrap());

/// The kind of flat resource a name is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// Queue names keep letters and digits only.
    Queue,
    /// Table names keep letters and digits only.
    Table,
    /// Container names keep letters, digits and single dashes.
    Container,
}

impl IdentifierKind {
    /// Error class reported for this kind.
    pub fn class(self) -> NameClass {
        match self {
            IdentifierKind::Queue => NameClass::Queue,
            IdentifierKind::Table => NameClass::Table,
            IdentifierKind::Container => NameClass::Container,
        }
    }

    fn disallowed(self) -> &'static Regex {
        match self {
            IdentifierKind::Queue | IdentifierKind::Table => &NOT_ALPHANUMERIC,
            IdentifierKind::Container => &NOT_ALPHANUMERIC_OR_DASH,
        }
    }
}

/// Canonicalize a queue, table or container name.
///
/// Characters outside the kind's allowed set are removed, the rest is
/// lower-cased and runs of dashes collapse to one. The result must then
/// match the service grammar (3 to 63 characters, alphanumeric at both
/// ends); nothing is truncated or padded to make it fit.
///
/// ```
/// use stowage_naming::{normalize_flat_identifier, IdentifierKind};
///
/// let name = normalize_flat_identifier("this--is-my-container-name", IdentifierKind::Table).unwrap();
/// assert_eq!(name, "thisismycontainername");
///
/// let name = normalize_flat_identifier("Invoices--2024", IdentifierKind::Container).unwrap();
/// assert_eq!(name, "invoices-2024");
/// ```
pub fn normalize_flat_identifier(raw: &str, kind: IdentifierKind) -> Result<String> {
    let stripped = kind.disallowed().replace_all(raw, "");
    let lowered = stripped.to_ascii_lowercase();
    let collapsed = REPEATED_DASH.replace_all(&lowered, "-").into_owned();

    validate_flat(&collapsed, kind).map_err(|reason| NamingError::invalid(kind.class(), raw, reason))?;
    Ok(collapsed)
}

/// Whether `name` is already a valid, canonical identifier of this kind.
pub fn is_valid_flat_identifier(name: &str, kind: IdentifierKind) -> bool {
    !kind.disallowed().is_match(name)
        && name == name.to_ascii_lowercase()
        && validate_flat(name, kind).is_ok()
}

fn validate_flat(name: &str, kind: IdentifierKind) -> std::result::Result<(), String> {
    let len = name.len();
    if len < MIN_FLAT_LEN || len > MAX_FLAT_LEN {
        return Err(format!(
            "length {} is outside {}..={} after removing disallowed characters",
            len, MIN_FLAT_LEN, MAX_FLAT_LEN
        ));
    }
    if !FLAT_GRAMMAR.is_match(name) {
        return Err(match kind {
            IdentifierKind::Container => {
                "must start and end with a letter or digit".to_string()
            }
            _ => "must contain only lowercase letters and digits".to_string(),
        });
    }
    Ok(())
}
