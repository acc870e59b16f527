//! Hierarchical blob names.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{NameClass, NamingError, Result};

/// Longest accepted blob name, in characters.
pub const MAX_BLOB_NAME_LEN: usize = 1024;

static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[./]+").unwrap());

static STRICT_CHARSET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_./]*$").unwrap());

/// Canonicalize a slash-delimited blob name.
///
/// Every run of separators collapses to a single character: a run made
/// only of slashes becomes `/`, a run containing any dot becomes `.`. A
/// segment ending in a dot therefore absorbs the slash after it, and
/// dot-only segments disappear together with the duplicated slashes around
/// them. Leading and trailing separators are trimmed.
///
/// In lenient mode any other character passes through unchanged. In strict
/// mode the input may contain only ASCII letters, digits, `_`, `.` and `/`;
/// anything else rejects the whole name.
///
/// ```
/// use stowage_naming::normalize_hierarchical_path;
///
/// let name = normalize_hierarchical_path("f1/folder2.././...//..///asd234as////d321.txt../asu8..txt", false).unwrap();
/// assert_eq!(name, "f1/folder2.asd234as/d321.txt.asu8.txt");
///
/// assert!(normalize_hierarchical_path("my folder/report.txt", true).is_err());
/// ```
pub fn normalize_hierarchical_path(raw: &str, strict: bool) -> Result<String> {
    if strict && !STRICT_CHARSET.is_match(raw) {
        let offending = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/')))
            .unwrap_or('?');
        return Err(NamingError::invalid(
            NameClass::BlobPath,
            raw,
            format!("character {:?} is not allowed in strict mode", offending),
        ));
    }

    let collapsed = SEPARATOR_RUN.replace_all(raw, |caps: &Captures<'_>| {
        if caps[0].contains('.') { "." } else { "/" }
    });
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c == '/');

    if trimmed.is_empty() {
        return Err(NamingError::invalid(
            NameClass::BlobPath,
            raw,
            "nothing left after collapsing separators",
        ));
    }
    if trimmed.chars().count() > MAX_BLOB_NAME_LEN {
        return Err(NamingError::invalid(
            NameClass::BlobPath,
            raw,
            format!("longer than {} characters", MAX_BLOB_NAME_LEN),
        ));
    }

    Ok(trimmed.to_string())
}
