//! Audit trail for the font lifecycle
//!
//! One JSON object per line in `~/.local/share/fontagent/audit.log`: every
//! registration, every withdrawal, each cache wipe and each suspicious read
//! of a cached font. The file is readable by its owner only.

use crate::cache::monitor::AccessRecord;
use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Something worth keeping a record of
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum AuditEvent {
    /// A cached font was read while registered
    #[serde(rename = "cache.suspicious_access")]
    SuspiciousAccess(AccessRecord),

    #[serde(rename = "font.registered")]
    FontRegistered { id: String, file: String },

    #[serde(rename = "font.unregistered")]
    FontUnregistered { id: String },

    /// Cache emptied by teardown or a startup purge
    #[serde(rename = "cache.wiped")]
    CacheWiped { removed: usize, failures: usize },
}

/// Append-only JSON lines writer
#[derive(Debug, Clone)]
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Log to the state directory when `general.audit_log` is on
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(),
        }
    }

    pub fn with_path(path: PathBuf, enabled: bool) -> Self {
        Self { enabled, path }
    }

    /// Logger that drops every event
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `event` with a timestamp and the agent's pid
    ///
    /// Write failures are logged and dropped; auditing never interrupts font
    /// handling.
    pub async fn record(&self, event: &AuditEvent) {
        if !self.enabled {
            return;
        }

        let line = match audit_line(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}

fn audit_line(event: &AuditEvent) -> serde_json::Result<String> {
    let mut value = serde_json::to_value(event)?;
    if let Some(fields) = value.as_object_mut() {
        fields.insert("timestamp".into(), Utc::now().to_rfc3339().into());
        fields.insert("pid".into(), std::process::id().into());
    }
    let mut line = serde_json::to_string(&value)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_lines(audit: &AuditLog) -> Vec<serde_json::Value> {
        std::fs::read_to_string(audit.path())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn lifecycle_events_are_tagged() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::with_path(dir.path().join("logs/audit.log"), true);

        audit
            .record(&AuditEvent::FontRegistered {
                id: "Acme-Sans".into(),
                file: "3f2a9c01d4e5b677.tmp".into(),
            })
            .await;
        audit
            .record(&AuditEvent::FontUnregistered {
                id: "Acme-Sans".into(),
            })
            .await;
        audit
            .record(&AuditEvent::CacheWiped {
                removed: 2,
                failures: 0,
            })
            .await;

        let lines = read_lines(&audit);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "font.registered");
        assert_eq!(lines[0]["file"], "3f2a9c01d4e5b677.tmp");
        assert_eq!(lines[1]["event"], "font.unregistered");
        assert_eq!(lines[2]["event"], "cache.wiped");
        assert_eq!(lines[2]["removed"], 2);
        assert_eq!(lines[2]["pid"], std::process::id());
        assert!(lines[2]["timestamp"].is_string());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn log_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let audit = AuditLog::with_path(dir.path().join("audit.log"), true);
        audit
            .record(&AuditEvent::FontUnregistered { id: "a".into() })
            .await;

        let mode = std::fs::metadata(audit.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[tokio::test]
    async fn disabled_log_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::with_path(dir.path().join("audit.log"), false);

        audit
            .record(&AuditEvent::FontUnregistered { id: "a".into() })
            .await;

        assert!(!audit.path().exists());
    }
}
