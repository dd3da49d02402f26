//! Batch synchronization
//!
//! Downloads and registers catalog entries one at a time, reporting progress
//! and collecting per-font failures without stopping the batch.

use crate::catalog::CatalogEntry;
use crate::error::{AgentError, AgentResult};
use crate::registry::FontLifecycleManager;
use crate::sync::download::Downloader;
use crate::sync::format;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Default per-download timeout
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Progress of the current (or last) run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub total: usize,
    pub completed: usize,
    /// Label of the font being processed
    pub current: String,
    /// `completed / total` rounded to a whole percent; 0 for an empty run
    pub percentage: u32,
}

/// One font that failed to sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub id: String,
    pub label: String,
    pub error: String,
}

/// Outcome of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<SyncFailure>,
    /// Whether the run stopped early on request
    pub cancelled: bool,
}

/// Drives a single sync run at a time
pub struct SyncOrchestrator {
    manager: Arc<FontLifecycleManager>,
    downloader: Arc<dyn Downloader>,
    progress_tx: Option<mpsc::UnboundedSender<SyncProgress>>,
    download_timeout: Duration,
    syncing: AtomicBool,
    running: watch::Sender<bool>,
    cancel_requested: AtomicBool,
    progress: Mutex<SyncProgress>,
}

/// Clears the syncing flag and wakes `wait_idle` callers on every exit path
struct SyncingGuard<'a>(&'a SyncOrchestrator);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.syncing.store(false, Ordering::SeqCst);
        self.0.running.send_replace(false);
    }
}

impl SyncOrchestrator {
    /// Create an orchestrator with no progress sink
    pub fn new(manager: Arc<FontLifecycleManager>, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            manager,
            downloader,
            progress_tx: None,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            syncing: AtomicBool::new(false),
            running: watch::Sender::new(false),
            cancel_requested: AtomicBool::new(false),
            progress: Mutex::new(SyncProgress::default()),
        }
    }

    /// Push progress snapshots to `tx`
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<SyncProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Override the per-download timeout
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Manager fonts are registered with
    pub fn manager(&self) -> &Arc<FontLifecycleManager> {
        &self.manager
    }

    /// Download and register every target, in order
    ///
    /// Fails with `SyncInProgress` if another run is active. Individual font
    /// failures are collected in the result and never abort the batch.
    pub async fn sync_all_fonts(&self, targets: &[CatalogEntry]) -> AgentResult<SyncResult> {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AgentError::SyncInProgress);
        }
        self.running.send_replace(true);
        let _syncing = SyncingGuard(self);
        self.cancel_requested.store(false, Ordering::SeqCst);

        *self.progress.lock() = SyncProgress {
            total: targets.len(),
            ..SyncProgress::default()
        };

        info!("Starting synchronization of {} fonts", targets.len());
        let mut result = SyncResult::default();

        for (index, entry) in targets.iter().enumerate() {
            if self.cancel_requested.load(Ordering::SeqCst) {
                info!(
                    "Sync cancelled, {} font(s) not processed",
                    targets.len() - index
                );
                result.cancelled = true;
                break;
            }

            self.publish(|p| p.current = entry.display_name.clone());

            match self.sync_font(entry).await {
                Ok(()) => {
                    result.success_count += 1;
                    info!("Successfully synced: {}", entry.display_name);
                }
                Err(e) => {
                    warn!("Failed to sync {}: {}", entry.display_name, e);
                    result.failed_count += 1;
                    result.errors.push(SyncFailure {
                        id: entry.id.clone(),
                        label: entry.display_name.clone(),
                        error: e.to_string(),
                    });
                }
            }

            self.publish(|p| {
                p.completed += 1;
                p.percentage = percentage(p.completed, p.total);
            });
        }

        info!(
            "Synchronization complete - Success: {}, Failed: {}",
            result.success_count, result.failed_count
        );
        Ok(result)
    }

    /// Ask the running batch to stop after the current font
    ///
    /// Returns whether a run was active to receive the request.
    pub fn cancel_sync(&self) -> bool {
        if !self.is_syncing() {
            return false;
        }
        info!("Sync cancellation requested");
        self.cancel_requested.store(true, Ordering::SeqCst);
        true
    }

    /// Wait until no run is active
    ///
    /// The font in flight when this is called finishes (or fails) first.
    pub async fn wait_idle(&self) {
        let mut running = self.running.subscribe();
        // The sender lives in `self`, so this only ends once idle
        let _ = running.wait_for(|active| !*active).await;
    }

    /// Snapshot of the current progress
    pub fn progress(&self) -> SyncProgress {
        self.progress.lock().clone()
    }

    /// Whether a run is active
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }

    /// Download, validate, cache and register a single font
    ///
    /// Runs outside the single-flight guard, so a font can be enabled while a
    /// batch is active; the manager serializes work on the same id. An
    /// already registered font is left as it is.
    pub async fn sync_font(&self, entry: &CatalogEntry) -> AgentResult<()> {
        if self.manager.is_font_registered(&entry.id) {
            debug!("{} already registered, skipping download", entry.id);
            return Ok(());
        }

        let ext = format::font_extension(&entry.download_url)?;
        let bytes = match tokio::time::timeout(
            self.download_timeout,
            self.downloader
                .fetch(&entry.download_url, self.download_timeout),
        )
        .await
        {
            Ok(fetched) => fetched?,
            Err(_) => {
                return Err(AgentError::DownloadTimeout {
                    url: entry.download_url.clone(),
                    secs: self.download_timeout.as_secs(),
                })
            }
        };
        format::sniff_font_format(&bytes)?;

        let path = self.manager.cache().store(&entry.id, ext, &bytes).await?;
        self.manager
            .register_font(&path, &entry.display_name, &entry.id)
            .await?;
        Ok(())
    }

    fn publish(&self, update: impl FnOnce(&mut SyncProgress)) {
        let snapshot = {
            let mut progress = self.progress.lock();
            update(&mut progress);
            progress.clone()
        };
        if let Some(tx) = &self.progress_tx {
            // A dropped receiver just means nobody is watching
            let _ = tx.send(snapshot);
        }
    }
}

fn percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed * 100 + total / 2) / total) as u32
}
