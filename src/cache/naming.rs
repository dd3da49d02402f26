//! Cache filename generation
//!
//! Obfuscated names are the first 16 hex chars of `SHA-256(id || salt)` with a
//! generic `.tmp` extension. The salt is fixed when the process starts, so a
//! given id maps to the same name for the whole run and to a different name
//! on the next run.

use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hex characters kept from the digest
const NAME_LEN: usize = 16;

/// Extension given to every obfuscated file
pub const OBFUSCATED_EXT: &str = "tmp";

/// Per-process salt mixed into obfuscated names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSalt(String);

impl SessionSalt {
    /// Salt for the current process, computed on first use
    pub fn for_process() -> Self {
        static SALT: OnceLock<SessionSalt> = OnceLock::new();
        SALT.get_or_init(|| {
            let started = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            Self::from_parts(std::process::id(), started)
        })
        .clone()
    }

    /// Build a salt from a pid and a start timestamp
    pub fn from_parts(pid: u32, started_nanos: u128) -> Self {
        Self(format!("{}{}", pid, started_nanos))
    }
}

/// Hash-derived filename for a font id
pub fn obfuscated_name(id: &str, salt: &SessionSalt) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(salt.0.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{}.{}", &digest[..NAME_LEN], OBFUSCATED_EXT)
}

/// Readable filename for a font id, used when obfuscation is off
pub fn plain_name(id: &str, ext: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_start_matches('.');
    let stem = if stem.is_empty() { "font" } else { stem };
    format!("{}{}", stem, normalize_ext(ext))
}

/// Normalize an extension to lowercase with a leading dot (`TTF` -> `.ttf`)
pub fn normalize_ext(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed.to_ascii_lowercase())
    }
}
