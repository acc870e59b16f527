//! Partition and row keys.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{NameClass, NamingError, Result};

/// Largest accepted key, in bytes.
pub const MAX_KEY_LEN: usize = 1024;

static FORBIDDEN_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/\\#?\x00-\x1F\x7F-\x9F]").unwrap());

/// Canonicalize a partition or row key.
///
/// The table service rejects `/`, `\`, `#`, `?` and control characters in
/// keys; those are removed. Everything else, including case, is kept.
pub fn normalize_key(raw: &str) -> Result<String> {
    let cleaned = FORBIDDEN_KEY_CHARS.replace_all(raw, "");

    if cleaned.is_empty() {
        return Err(NamingError::invalid(
            NameClass::Key,
            raw,
            "nothing left after removing forbidden characters",
        ));
    }
    if cleaned.len() > MAX_KEY_LEN {
        return Err(NamingError::invalid(
            NameClass::Key,
            raw,
            format!("longer than {} bytes", MAX_KEY_LEN),
        ));
    }

    Ok(cleaned.into_owned())
}
