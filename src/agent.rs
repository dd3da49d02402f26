//! Agent bootstrap and teardown
//!
//! Wires the registrar, secure cache, lifecycle manager and sync orchestrator
//! together from configuration. Startup reconciles leftovers from a previous
//! run before any new work is accepted.

use crate::audit::AuditLog;
use crate::cache::{SecureCache, SecureCacheConfig};
use crate::catalog::CatalogEntry;
use crate::config::{Config, ConfigManager};
use crate::error::AgentResult;
use crate::registrar::{create_available_registrar, FontRegistrar, UnregisterSummary};
use crate::registry::FontLifecycleManager;
use crate::sync::{Downloader, HttpDownloader, SyncOrchestrator, SyncProgress};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a forced teardown removed
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReclaimReport {
    /// Registrations withdrawn by the registrar's bulk path
    pub unregistered: usize,
    /// Registrations the registrar could not withdraw
    pub unregister_failed: usize,
    /// Cache entries present before the wipe
    pub cache_entries: usize,
    /// Cache entries still present afterwards
    pub cache_entries_left: usize,
}

/// A running agent
pub struct Agent {
    cache: Arc<SecureCache>,
    manager: Arc<FontLifecycleManager>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl Agent {
    /// Start with the platform registrar and the HTTP downloader
    ///
    /// A missing registration capability or an uncreatable cache directory
    /// aborts startup.
    pub async fn start(
        config: &Config,
        progress: Option<mpsc::UnboundedSender<SyncProgress>>,
    ) -> AgentResult<Self> {
        let registrar = create_available_registrar().await?;
        let downloader = Arc::new(HttpDownloader::from(&config.sync));
        Self::start_with(config, registrar, downloader, progress).await
    }

    /// Start with explicit collaborators
    pub async fn start_with(
        config: &Config,
        registrar: Arc<dyn FontRegistrar>,
        downloader: Arc<dyn Downloader>,
        progress: Option<mpsc::UnboundedSender<SyncProgress>>,
    ) -> AgentResult<Self> {
        info!("Starting font agent with {} registrar", registrar.registrar_name());

        reconcile_registrations(registrar.as_ref()).await;

        let cache = Arc::new(secure_cache(config));
        cache.initialize_secure_directory().await?;

        let manager = Arc::new(FontLifecycleManager::new(registrar, cache.clone()));
        let mut orchestrator = SyncOrchestrator::new(manager.clone(), downloader)
            .with_download_timeout(Duration::from_secs(config.sync.download_timeout_secs));
        if let Some(tx) = progress {
            orchestrator = orchestrator.with_progress(tx);
        }

        Ok(Self {
            cache,
            manager,
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// Secure cache in use
    pub fn cache(&self) -> &Arc<SecureCache> {
        &self.cache
    }

    /// Lifecycle manager in use
    pub fn manager(&self) -> &Arc<FontLifecycleManager> {
        &self.manager
    }

    /// Sync orchestrator in use
    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator> {
        &self.orchestrator
    }

    /// Make one catalog font available while the agent runs
    pub async fn enable_font(&self, entry: &CatalogEntry) -> AgentResult<()> {
        info!("Enabling font: {}", entry.display_name);
        self.orchestrator.sync_font(entry).await
    }

    /// Withdraw one font and destroy its cached file
    pub async fn disable_font(&self, id: &str) -> AgentResult<()> {
        info!("Disabling font: {}", id);
        self.manager.unregister_font(id).await
    }

    /// Stop any sync after its current font, then unregister and wipe
    /// everything. Never fails.
    ///
    /// The font in flight finishes before teardown starts, so nothing it
    /// stores or registers outlives the cleanup.
    pub async fn shutdown(&self) {
        if self.orchestrator.cancel_sync() {
            debug!("Waiting for the running sync to stop");
        }
        self.orchestrator.wait_idle().await;
        self.manager.cleanup().await;
        info!("Font agent stopped");
    }

    /// Tear down what a crashed run may have left behind
    ///
    /// Runs without starting the access monitor or creating the cache.
    pub async fn reclaim(config: &Config, registrar: &dyn FontRegistrar) -> ReclaimReport {
        let mut cache_config = SecureCacheConfig::from(&config.cache);
        cache_config.enable_file_watcher = false;
        let cache = SecureCache::new(
            ConfigManager::cache_base_dir(config),
            cache_config,
            AuditLog::new(config),
        );

        let summary = reconcile_registrations(registrar).await;
        let cache_entries = cache.entry_count().await;
        cache.cleanup().await;

        ReclaimReport {
            unregistered: summary.success,
            unregister_failed: summary.failed,
            cache_entries,
            cache_entries_left: cache.entry_count().await,
        }
    }
}

/// Build the secure cache described by `config`
pub fn secure_cache(config: &Config) -> SecureCache {
    SecureCache::new(
        ConfigManager::cache_base_dir(config),
        SecureCacheConfig::from(&config.cache),
        AuditLog::new(config),
    )
}

/// Withdraw registrations left over from an earlier run
async fn reconcile_registrations(registrar: &dyn FontRegistrar) -> UnregisterSummary {
    match registrar.unregister_all().await {
        Ok(summary) => {
            if summary.success > 0 || summary.failed > 0 {
                info!(
                    "Reconciled leftover registrations - Success: {}, Failed: {}",
                    summary.success, summary.failed
                );
            }
            summary
        }
        Err(e) => {
            warn!("Could not reconcile leftover registrations: {}", e);
            UnregisterSummary::default()
        }
    }
}
