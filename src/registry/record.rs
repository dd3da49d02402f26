//! Registered font records

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A font currently registered with the system
///
/// Records exist only in memory and only after the registrar accepted the
/// font. The manager owns `file_path` exclusively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontRecord {
    /// Stable font identifier
    pub id: String,

    /// Name shown to the user
    pub display_name: String,

    /// Cached font file backing the registration
    pub file_path: PathBuf,

    /// When registration succeeded
    pub registered_at: DateTime<Utc>,

    /// Whether the font is active
    pub is_active: bool,
}

impl FontRecord {
    /// Create an active record registered now
    pub fn new(id: &str, display_name: &str, file_path: &Path) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            file_path: file_path.to_path_buf(),
            registered_at: Utc::now(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_active() {
        let record = FontRecord::new("acme-sans", "Acme Sans", Path::new("/c/1.tmp"));
        assert!(record.is_active);
        assert_eq!(record.id, "acme-sans");
        assert!(record.registered_at <= Utc::now());
    }

    #[test]
    fn serializes_for_json_output() {
        let record = FontRecord::new("acme-sans", "Acme Sans", Path::new("/c/1.tmp"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["display_name"], "Acme Sans");
        assert_eq!(json["is_active"], true);
    }
}
