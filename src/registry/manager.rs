//! Font lifecycle management
//!
//! Per id: `Unregistered -> Registered -> Unregistered (file deleted)`. A
//! failed registration always returns to `Unregistered` with the cached file
//! removed, so no file outlives its registration.

use crate::audit::AuditEvent;
use crate::cache::SecureCache;
use crate::error::{AgentError, AgentResult};
use crate::registrar::FontRegistrar;
use crate::registry::record::FontRecord;
use crate::teardown::Teardown;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Authoritative registry of fonts registered by this process
///
/// Operations on one id are linearized; distinct ids proceed independently.
/// `cleanup` waits for in-flight operations and closes the manager: later
/// registrations discard their file and fail with `ShuttingDown`.
pub struct FontLifecycleManager {
    registrar: Arc<dyn FontRegistrar>,
    cache: Arc<SecureCache>,
    records: RwLock<HashMap<String, FontRecord>>,
    id_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    gate: tokio::sync::RwLock<()>,
    closed: AtomicBool,
}

/// Removes an id's lock from the map once its last user is done, even if
/// the operation future is dropped part way
struct IdLockEntry<'a> {
    locks: &'a Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    id: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for IdLockEntry<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // The map holds one reference and this entry the other
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(self.id);
        }
    }
}

impl FontLifecycleManager {
    /// Create a manager with an empty registry
    pub fn new(registrar: Arc<dyn FontRegistrar>, cache: Arc<SecureCache>) -> Self {
        Self {
            registrar,
            cache,
            records: RwLock::new(HashMap::new()),
            id_locks: Mutex::new(HashMap::new()),
            gate: tokio::sync::RwLock::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Secure cache backing registered files
    pub fn cache(&self) -> &Arc<SecureCache> {
        &self.cache
    }

    /// Registration backend
    pub fn registrar(&self) -> &Arc<dyn FontRegistrar> {
        &self.registrar
    }

    /// Register the font file at `path` under `id`
    ///
    /// The file must exist. It is made read-only before the registrar sees
    /// it. On any failure the file is securely deleted and no record is
    /// kept.
    pub async fn register_font(
        &self,
        path: &Path,
        display_name: &str,
        id: &str,
    ) -> AgentResult<FontRecord> {
        if id.trim().is_empty() {
            self.discard(path).await;
            return Err(AgentError::InvalidFontId(id.to_string()));
        }

        self.with_id_lock(id, || self.register_locked(path, display_name, id))
            .await
    }

    /// Unregister a font and delete its file
    ///
    /// If the registrar refuses, the record and file stay as they were so the
    /// call can be retried.
    pub async fn unregister_font(&self, id: &str) -> AgentResult<()> {
        self.with_id_lock(id, || self.unregister_locked(id)).await
    }

    /// Check if a font is currently registered
    pub fn is_font_registered(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    /// Snapshot of one record
    pub fn get_font(&self, id: &str) -> Option<FontRecord> {
        self.records.read().get(id).cloned()
    }

    /// Snapshot of all records, oldest registration first
    pub fn get_registered_fonts(&self) -> Vec<FontRecord> {
        let mut fonts: Vec<FontRecord> = self.records.read().values().cloned().collect();
        fonts.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        fonts
    }

    /// Whether `cleanup` has run
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of registered fonts
    pub fn registered_count(&self) -> usize {
        self.records.read().len()
    }

    /// Unregister everything and wipe the cache
    ///
    /// Uses the registrar's bulk path, which also covers registrations this
    /// process has no record of. Never fails.
    pub async fn cleanup(&self) {
        info!("Starting font lifecycle cleanup");
        let _gate = self.gate.write().await;
        self.closed.store(true, Ordering::SeqCst);
        let mut teardown = Teardown::new("font lifecycle");

        if let Some(summary) = teardown
            .step("unregister all fonts", self.registrar.unregister_all())
            .await
        {
            info!(
                "Unregistered fonts - Success: {}, Failed: {}",
                summary.success, summary.failed
            );
            if summary.failed > 0 {
                teardown.record(
                    "unregister all fonts",
                    format!("{} registration(s) left behind", summary.failed),
                );
            }
        }

        let cleared = {
            let mut records = self.records.write();
            let count = records.len();
            records.clear();
            count
        };
        debug!("Cleared {} font record(s)", cleared);

        self.cache.cleanup().await;
        teardown.finish();
        info!("Font lifecycle cleanup completed");
    }

    async fn register_locked(
        &self,
        path: &Path,
        display_name: &str,
        id: &str,
    ) -> AgentResult<FontRecord> {
        if fs::symlink_metadata(path).await.is_err() {
            return Err(AgentError::FileNotFound(path.to_path_buf()));
        }

        if self.is_closed() {
            self.discard(path).await;
            return Err(AgentError::ShuttingDown);
        }

        if let Some(existing) = self.get_font(id) {
            if existing.file_path != path {
                self.discard(path).await;
            }
            return Err(AgentError::AlreadyRegistered(id.to_string()));
        }

        if let Err(e) = set_read_only(path).await {
            self.discard(path).await;
            return Err(AgentError::registration(
                display_name,
                format!("setting read-only: {}", e),
            ));
        }

        let refused = match self.registrar.register(path).await {
            Ok(true) => None,
            Ok(false) => Some("registration refused".to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = refused {
            warn!("Failed to register font {}: {}", display_name, reason);
            self.discard(path).await;
            return Err(AgentError::registration(display_name, reason));
        }

        let record = FontRecord::new(id, display_name, path);
        self.records.write().insert(id.to_string(), record.clone());
        self.cache
            .audit()
            .record(&AuditEvent::FontRegistered {
                id: id.to_string(),
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
            .await;

        info!(
            "Font registered successfully: {} at {}",
            display_name,
            path.display()
        );
        Ok(record)
    }

    async fn unregister_locked(&self, id: &str) -> AgentResult<()> {
        let record = self
            .get_font(id)
            .ok_or_else(|| AgentError::FontNotFound(id.to_string()))?;

        info!("Unregistering font: {}", record.display_name);
        let refused = match self.registrar.unregister(&record.file_path).await {
            Ok(true) => None,
            Ok(false) => Some("registration could not be withdrawn".to_string()),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = refused {
            return Err(AgentError::Unregistration {
                id: id.to_string(),
                reason,
            });
        }

        self.records.write().remove(id);
        self.cache
            .audit()
            .record(&AuditEvent::FontUnregistered { id: id.to_string() })
            .await;
        if !self.cache.secure_delete(&record.file_path).await {
            warn!(
                "Font {} unregistered but {} could not be deleted",
                id,
                record.file_path.display()
            );
        }

        info!("Font unregistered successfully: {}", record.display_name);
        Ok(())
    }

    /// Remove a file that will not become (or no longer is) a registration
    async fn discard(&self, path: &Path) {
        if fs::symlink_metadata(path).await.is_ok() {
            self.cache.secure_delete(path).await;
        }
    }

    async fn with_id_lock<T, F, Fut>(&self, id: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _gate = self.gate.read().await;
        let entry = IdLockEntry {
            locks: &self.id_locks,
            id,
            lock: self
                .id_locks
                .lock()
                .entry(id.to_string())
                .or_default()
                .clone(),
        };

        let _guard = entry.lock.lock().await;
        op().await
    }
}

async fn set_read_only(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o400)).await
    }
    #[cfg(not(unix))]
    {
        let mut perms = fs::metadata(path).await?.permissions();
        perms.set_readonly(true);
        fs::set_permissions(path, perms).await
    }
}
