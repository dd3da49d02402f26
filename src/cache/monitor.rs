//! Access monitor for the secure cache directory
//!
//! Every filesystem event under the directory schedules a deferred check.
//! If the file was read within the sensitivity window the access is written
//! to the audit log. The monitor only detects and records; it never blocks
//! or removes anything.

use crate::audit::{AuditEvent, AuditLog};
use chrono::{DateTime, Utc};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

/// What the monitor saw when a cache entry was read inside the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRecord {
    pub event_type: &'static str,
    /// Cache file name, obfuscated when obfuscation is on
    pub filename: String,
    pub file_size: u64,
    pub access_time: String,
    pub modify_time: Option<String>,
}

/// Running watcher plus the task that evaluates its events
pub struct AccessMonitor {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
    dir: PathBuf,
}

impl std::fmt::Debug for AccessMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessMonitor")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl AccessMonitor {
    /// Start watching `dir` recursively
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(dir: &Path, sensitivity: Duration, audit: AuditLog) -> notify::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    // Receiver gone means the monitor is shutting down
                    let _ = tx.send(event);
                }
                Err(e) => warn!("Cache watcher error: {}", e),
            }
        })?;
        watcher.watch(dir, RecursiveMode::Recursive)?;

        let task = tokio::spawn(async move {
            let mut checks = JoinSet::new();
            while let Some(event) = rx.recv().await {
                let event_type = event_type(&event.kind);
                for path in event.paths {
                    debug!("Cache event {} on {}", event_type, path.display());
                    let audit = audit.clone();
                    checks.spawn(async move {
                        tokio::time::sleep(sensitivity).await;
                        if let Some(record) = check_recent_access(&path, event_type, sensitivity).await
                        {
                            audit.record(&AuditEvent::SuspiciousAccess(record)).await;
                        }
                    });
                }
                while checks.try_join_next().is_some() {}
            }
        });

        debug!("Access monitor started for {}", dir.display());
        Ok(Self {
            _watcher: watcher,
            task,
            dir: dir.to_path_buf(),
        })
    }

    /// Directory being watched
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stop watching and cancel pending checks
    pub fn stop(self) {
        self.task.abort();
        debug!("Access monitor stopped for {}", self.dir.display());
    }
}

/// Inspect a cache entry after an event
///
/// Returns the audit record when the file was accessed less than `window`
/// ago. A file that vanished in the meantime is not suspicious.
pub async fn check_recent_access(
    path: &Path,
    event_type: &'static str,
    window: Duration,
) -> Option<AccessRecord> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }

    let accessed = meta.accessed().ok()?;
    let age = SystemTime::now()
        .duration_since(accessed)
        .unwrap_or_default();
    if age >= window {
        return None;
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let modified = meta.modified().ok().map(rfc3339);

    warn!(
        "Suspicious access detected: {} on cache entry {}",
        event_type, filename
    );

    Some(AccessRecord {
        event_type,
        filename,
        file_size: meta.len(),
        access_time: rfc3339(accessed),
        modify_time: modified,
    })
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

fn event_type(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Access(_) => "access",
        EventKind::Create(_) => "create",
        EventKind::Modify(_) => "modify",
        EventKind::Remove(_) => "remove",
        EventKind::Any | EventKind::Other => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn recent_access_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0a1b2c3d4e5f6789.tmp");
        tokio::fs::write(&path, b"OTTO-font-bytes").await.unwrap();
        let _ = tokio::fs::read(&path).await.unwrap();

        let record = check_recent_access(&path, "access", Duration::from_secs(3600))
            .await
            .expect("recent read should be reported");

        assert_eq!(record.event_type, "access");
        assert_eq!(record.filename, "0a1b2c3d4e5f6789.tmp");
        assert_eq!(record.file_size, 15);
        assert!(record.modify_time.is_some());

        let logged = serde_json::to_value(AuditEvent::SuspiciousAccess(record)).unwrap();
        assert_eq!(logged["event"], "cache.suspicious_access");
        assert_eq!(logged["filename"], "0a1b2c3d4e5f6789.tmp");
    }

    #[tokio::test]
    async fn access_outside_window_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entry.tmp");
        tokio::fs::write(&path, b"x").await.unwrap();

        assert!(check_recent_access(&path, "modify", Duration::ZERO)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn missing_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.tmp");
        assert!(check_recent_access(&path, "remove", Duration::from_secs(60))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn start_and_stop() {
        let dir = TempDir::new().unwrap();
        let monitor =
            AccessMonitor::start(dir.path(), Duration::from_millis(10), AuditLog::disabled())
                .unwrap();
        assert_eq!(monitor.dir(), dir.path());
        monitor.stop();
    }

    #[test]
    fn event_names() {
        assert_eq!(event_type(&EventKind::Any), "other");
        assert_eq!(
            event_type(&EventKind::Create(notify::event::CreateKind::File)),
            "create"
        );
    }
}
