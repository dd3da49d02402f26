//! Secure font cache
//!
//! Cached font bytes live in a hidden chain under the base directory
//! (`<base>/.system/.cache/.tmp/.fonts`). Files get hash-derived names,
//! directories are restricted to the owner and every entry is overwritten
//! with random bytes before it is unlinked.

use crate::audit::{AuditEvent, AuditLog};
use crate::cache::monitor::AccessMonitor;
use crate::cache::naming::{self, SessionSalt};
use crate::error::{AgentError, AgentResult};
use crate::teardown::Teardown;
use parking_lot::{Mutex, RwLock};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// Hidden segments nested under the base directory
const HIDDEN_CHAIN: [&str; 4] = [".system", ".cache", ".tmp", ".fonts"];

/// Chunk size used when overwriting a file with random bytes
const OVERWRITE_CHUNK: usize = 64 * 1024;

/// Secure cache behavior switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureCacheConfig {
    /// Watch the directory for suspicious access
    pub enable_file_watcher: bool,
    /// Use hash-derived filenames
    pub enable_obfuscation: bool,
    /// Restrict directories to the owner
    pub enable_permission_hardening: bool,
    /// Access monitor window in milliseconds
    pub watcher_sensitivity_ms: u64,
}

impl Default for SecureCacheConfig {
    fn default() -> Self {
        Self {
            enable_file_watcher: true,
            enable_obfuscation: true,
            enable_permission_hardening: true,
            watcher_sensitivity_ms: 2000,
        }
    }
}

impl From<&crate::config::schema::CacheConfig> for SecureCacheConfig {
    fn from(config: &crate::config::schema::CacheConfig) -> Self {
        Self {
            enable_file_watcher: config.enable_file_watcher,
            enable_obfuscation: config.enable_obfuscation,
            enable_permission_hardening: config.enable_permission_hardening,
            watcher_sensitivity_ms: config.watcher_sensitivity_ms,
        }
    }
}

/// Snapshot of the cache state for status output
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    /// Directory holding cached fonts
    pub directory: PathBuf,
    /// Whether the access monitor is running
    pub watching: bool,
    /// Active configuration
    pub config: SecureCacheConfig,
}

/// Hidden, self-cleaning storage for font bytes
pub struct SecureCache {
    base_dir: PathBuf,
    dir: PathBuf,
    salt: SessionSalt,
    config: RwLock<SecureCacheConfig>,
    monitor: Mutex<Option<AccessMonitor>>,
    audit: AuditLog,
}

impl std::fmt::Debug for SecureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureCache")
            .field("dir", &self.dir)
            .field("config", &*self.config.read())
            .finish_non_exhaustive()
    }
}

impl SecureCache {
    /// Create a cache rooted under `base_dir`; nothing is touched on disk yet
    pub fn new(base_dir: impl Into<PathBuf>, config: SecureCacheConfig, audit: AuditLog) -> Self {
        Self::with_salt(base_dir, config, audit, SessionSalt::for_process())
    }

    /// Create a cache with an explicit naming salt
    pub fn with_salt(
        base_dir: impl Into<PathBuf>,
        config: SecureCacheConfig,
        audit: AuditLog,
        salt: SessionSalt,
    ) -> Self {
        let base_dir = base_dir.into();
        let dir = HIDDEN_CHAIN
            .iter()
            .fold(base_dir.clone(), |path, segment| path.join(segment));
        Self {
            base_dir,
            dir,
            salt,
            config: RwLock::new(config),
            monitor: Mutex::new(None),
            audit,
        }
    }

    /// Directory holding cached fonts
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Current configuration
    pub fn config(&self) -> SecureCacheConfig {
        self.config.read().clone()
    }

    /// Replace the configuration
    ///
    /// Takes effect for subsequent calls; a running monitor keeps its window
    /// until it is restarted.
    pub fn update_config(&self, config: SecureCacheConfig) {
        debug!("Secure cache config updated: {:?}", config);
        *self.config.write() = config;
    }

    /// Whether the access monitor is running
    pub fn is_watching(&self) -> bool {
        self.monitor.lock().is_some()
    }

    /// Snapshot for status output
    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            directory: self.dir.clone(),
            watching: self.is_watching(),
            config: self.config(),
        }
    }

    /// Create the hidden directory chain and prepare it for use
    ///
    /// Any directory that cannot be created is fatal. Permission hardening and
    /// the access monitor are best-effort. Entries left behind by an earlier
    /// run are wiped before the monitor starts.
    pub async fn initialize_secure_directory(&self) -> AgentResult<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder
            .create(&self.dir)
            .await
            .map_err(|e| AgentError::CacheInit {
                path: self.dir.clone(),
                source: e,
            })?;

        let config = self.config();
        if config.enable_permission_hardening {
            self.harden_permissions().await;
        }

        let stale = self.purge_entries().await;
        if stale > 0 {
            info!("Removed {} stale cache entries from a previous run", stale);
        }

        if config.enable_file_watcher {
            self.start_monitor(Duration::from_millis(config.watcher_sensitivity_ms));
        }

        info!("Secure font directory initialized: {}", self.dir.display());
        Ok(())
    }

    /// Path a font with `id` should be written to
    ///
    /// Obfuscated names are stable for one process lifetime, so callers that
    /// need uniqueness must not reuse an id concurrently.
    pub fn get_secure_file_path(&self, id: &str, ext: &str) -> PathBuf {
        let filename = if self.config.read().enable_obfuscation {
            naming::obfuscated_name(id, &self.salt)
        } else {
            naming::plain_name(id, ext)
        };
        self.dir.join(filename)
    }

    /// Write font bytes to the cache and return their path
    ///
    /// The file is created owner read/write and must not exist yet, so a file
    /// owned by a registered font is never clobbered. A partial file is
    /// removed on failure.
    pub async fn store(&self, id: &str, ext: &str, bytes: &[u8]) -> AgentResult<PathBuf> {
        let path = self.get_secure_file_path(id, ext);
        if let Err(e) = write_private(&path, bytes).await {
            if e.kind() != std::io::ErrorKind::AlreadyExists {
                self.secure_delete(&path).await;
            }
            return Err(AgentError::io(
                format!("writing cache file {}", path.display()),
                e,
            ));
        }
        debug!("Cached {} ({} bytes) at {}", id, bytes.len(), path.display());
        Ok(path)
    }

    /// Overwrite a file with random bytes, then unlink it
    ///
    /// Falls back to a plain unlink if the overwrite fails. Returns whether
    /// the path is gone afterwards; never fails.
    pub async fn secure_delete(&self, path: &Path) -> bool {
        let target = path.to_path_buf();
        let overwrite = tokio::task::spawn_blocking(move || overwrite_with_random(&target)).await;
        match overwrite {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(
                "Overwrite of {} failed, unlinking directly: {}",
                path.display(),
                e
            ),
            Err(e) => warn!("Overwrite task for {} failed: {}", path.display(), e),
        }

        // Read-only font files need write permission back before unlinking on
        // some platforms.
        let _ = set_mode(path, 0o600).await;

        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Securely deleted {}", path.display());
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                fs::symlink_metadata(path).await.is_err()
            }
        }
    }

    /// Stop monitoring and wipe every entry in the cache directory
    ///
    /// Never fails; problems are logged and the remaining entries are still
    /// processed.
    pub async fn cleanup(&self) {
        info!("Cleaning up secure font cache");
        if let Some(monitor) = self.monitor.lock().take() {
            monitor.stop();
        }

        let mut teardown = Teardown::new("secure cache");
        let removed = self.wipe_entries(&mut teardown).await;
        let failures = teardown.finish().len();
        self.audit
            .record(&AuditEvent::CacheWiped { removed, failures })
            .await;
    }

    /// Audit trail shared with the access monitor
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Count of entries currently in the cache directory
    pub async fn entry_count(&self) -> usize {
        let Ok(mut entries) = fs::read_dir(&self.dir).await else {
            return 0;
        };
        let mut count = 0;
        while let Ok(Some(_)) = entries.next_entry().await {
            count += 1;
        }
        count
    }

    async fn purge_entries(&self) -> usize {
        let mut teardown = Teardown::new("stale cache purge");
        let removed = self.wipe_entries(&mut teardown).await;
        let failures = teardown.finish().len();
        if removed > 0 || failures > 0 {
            self.audit
                .record(&AuditEvent::CacheWiped { removed, failures })
                .await;
        }
        removed
    }

    async fn wipe_entries(&self, teardown: &mut Teardown) -> usize {
        self.wipe_dir(&self.dir, teardown).await
    }

    /// Securely delete everything below `dir`, descending into
    /// subdirectories so no nested file escapes the overwrite
    ///
    /// Returns how many direct children of `dir` were removed.
    fn wipe_dir<'a>(
        &'a self,
        dir: &'a Path,
        teardown: &'a mut Teardown,
    ) -> Pin<Box<dyn Future<Output = usize> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = match fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Cache directory {} does not exist", dir.display());
                    return 0;
                }
                Err(e) => {
                    teardown.record(&format!("read {}", dir.display()), e);
                    return 0;
                }
            };

            let mut removed = 0;
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        teardown.record("read cache entry", e);
                        break;
                    }
                };

                let path = entry.path();
                // Symlinks report as non-directories and are unlinked, never followed
                let is_dir = entry
                    .file_type()
                    .await
                    .map(|t| t.is_dir())
                    .unwrap_or(false);

                if is_dir {
                    self.wipe_dir(&path, teardown).await;
                    match fs::remove_dir(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) => teardown.record(&format!("remove {}", path.display()), e),
                    }
                } else if self.secure_delete(&path).await {
                    removed += 1;
                } else {
                    teardown.record(&format!("delete {}", path.display()), "file still present");
                }
            }
            removed
        })
    }

    fn start_monitor(&self, sensitivity: Duration) {
        let mut slot = self.monitor.lock();
        if slot.is_some() {
            return;
        }
        match AccessMonitor::start(&self.dir, sensitivity, self.audit.clone()) {
            Ok(monitor) => {
                *slot = Some(monitor);
                info!("File system watcher started for font security");
            }
            Err(e) => warn!("Could not start cache access monitor: {}", e),
        }
    }

    /// Restrict the base directory and the hidden chain to the owner
    async fn harden_permissions(&self) {
        let mut path = self.base_dir.clone();
        let mut segments = vec![path.clone()];
        for segment in HIDDEN_CHAIN {
            path = path.join(segment);
            segments.push(path.clone());
        }

        for segment in segments {
            if !owned_by_current_user(&segment).await {
                warn!(
                    "Not hardening {}: owned by another user",
                    segment.display()
                );
                continue;
            }
            if let Err(e) = set_mode(&segment, 0o700).await {
                warn!("Could not set permissions on {}: {}", segment.display(), e);
            }
        }
    }
}

/// Overwrite a regular file in place with random bytes of the same length
///
/// Symlinks and other non-regular entries are refused so the overwrite never
/// escapes the cache directory.
fn overwrite_with_random(path: &Path) -> std::io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if !meta.file_type().is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    let mut file = std::fs::OpenOptions::new().write(true).open(path)?;
    let mut remaining = meta.len() as usize;
    let mut chunk = vec![0u8; OVERWRITE_CHUNK.min(remaining.max(1))];
    let mut rng = rand::rng();
    while remaining > 0 {
        let n = remaining.min(chunk.len());
        rng.fill_bytes(&mut chunk[..n]);
        file.write_all(&chunk[..n])?;
        remaining -= n;
    }
    file.sync_all()
}

async fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

async fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
    }
    #[cfg(not(unix))]
    {
        let _ = (path, mode);
        Ok(())
    }
}

async fn owned_by_current_user(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        match fs::metadata(path).await {
            // SAFETY: geteuid has no preconditions and cannot fail
            Ok(meta) => meta.uid() == unsafe { libc::geteuid() },
            Err(_) => false,
        }
    }
    #[cfg(not(unix))]
    {
        fs::metadata(path).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet_config() -> SecureCacheConfig {
        SecureCacheConfig {
            enable_file_watcher: false,
            ..SecureCacheConfig::default()
        }
    }

    async fn test_cache(config: SecureCacheConfig) -> (SecureCache, TempDir) {
        let temp = TempDir::new().unwrap();
        let cache = SecureCache::new(temp.path(), config, AuditLog::disabled());
        cache.initialize_secure_directory().await.unwrap();
        (cache, temp)
    }

    #[tokio::test]
    async fn initialize_creates_hidden_chain() {
        let (cache, temp) = test_cache(quiet_config()).await;
        let expected = temp.path().join(".system/.cache/.tmp/.fonts");
        assert_eq!(cache.directory(), expected);
        assert!(expected.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn initialize_hardens_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (cache, temp) = test_cache(quiet_config()).await;
        for dir in [temp.path().join(".system"), cache.directory().to_path_buf()] {
            let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700, "{}", dir.display());
        }
    }

    #[tokio::test]
    async fn initialize_fails_when_base_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let cache = SecureCache::new(&blocker, quiet_config(), AuditLog::disabled());
        let err = cache.initialize_secure_directory().await.unwrap_err();
        assert!(matches!(err, AgentError::CacheInit { .. }));
    }

    #[tokio::test]
    async fn initialize_purges_leftovers() {
        let temp = TempDir::new().unwrap();
        let cache = SecureCache::new(temp.path(), quiet_config(), AuditLog::disabled());
        cache.initialize_secure_directory().await.unwrap();
        cache.store("left-over", ".ttf", b"true0000").await.unwrap();

        let restarted = SecureCache::new(temp.path(), quiet_config(), AuditLog::disabled());
        restarted.initialize_secure_directory().await.unwrap();
        assert_eq!(restarted.entry_count().await, 0);
    }

    #[tokio::test]
    async fn obfuscated_path_is_generic() {
        let (cache, _temp) = test_cache(quiet_config()).await;
        let path = cache.get_secure_file_path("Boritype-Regular", ".otf");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(".tmp"));
        assert!(!name.contains("Boritype"));
        assert_eq!(path.parent().unwrap(), cache.directory());
        // same id within one run maps to the same name
        assert_eq!(path, cache.get_secure_file_path("Boritype-Regular", ".otf"));
    }

    #[tokio::test]
    async fn plain_path_without_obfuscation() {
        let (cache, _temp) = test_cache(quiet_config()).await;
        cache.update_config(SecureCacheConfig {
            enable_obfuscation: false,
            ..quiet_config()
        });
        let path = cache.get_secure_file_path("Roboto-Bold", ".TTF");
        assert_eq!(path.file_name().unwrap(), "Roboto-Bold.ttf");
    }

    #[tokio::test]
    async fn different_salts_give_different_paths() {
        let temp = TempDir::new().unwrap();
        let a = SecureCache::with_salt(
            temp.path(),
            quiet_config(),
            AuditLog::disabled(),
            SessionSalt::from_parts(1, 10),
        );
        let b = SecureCache::with_salt(
            temp.path(),
            quiet_config(),
            AuditLog::disabled(),
            SessionSalt::from_parts(2, 20),
        );
        assert_ne!(
            a.get_secure_file_path("font", ".ttf"),
            b.get_secure_file_path("font", ".ttf")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn store_writes_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (cache, _temp) = test_cache(quiet_config()).await;
        let path = cache.store("a", ".ttf", b"\x00\x01\x00\x00").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\x00\x01\x00\x00");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[tokio::test]
    async fn store_refuses_existing_file() {
        let (cache, _temp) = test_cache(quiet_config()).await;
        let path = cache.store("dup", ".ttf", b"first").await.unwrap();

        let err = cache.store("dup", ".ttf", b"second").await.unwrap_err();
        assert!(matches!(err, AgentError::Io { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }

    #[tokio::test]
    async fn secure_delete_removes_file() {
        let (cache, _temp) = test_cache(quiet_config()).await;
        let path = cache.store("a", ".ttf", &vec![7u8; 200_000]).await.unwrap();

        assert!(cache.secure_delete(&path).await);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn secure_delete_removes_read_only_file() {
        use std::os::unix::fs::PermissionsExt;

        let (cache, _temp) = test_cache(quiet_config()).await;
        let path = cache.store("ro", ".ttf", b"OTTO").await.unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o400)).unwrap();

        assert!(cache.secure_delete(&path).await);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn secure_delete_falls_back_when_overwrite_fails() {
        let (cache, temp) = test_cache(quiet_config()).await;
        let outside = temp.path().join("outside.ttf");
        std::fs::write(&outside, b"keep me").unwrap();
        let link = cache.directory().join("link.tmp");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        // overwrite refuses the symlink, unlink still happens
        assert!(cache.secure_delete(&link).await);
        assert!(std::fs::symlink_metadata(&link).is_err());
        assert_eq!(std::fs::read(&outside).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn secure_delete_missing_file_is_ok() {
        let (cache, _temp) = test_cache(quiet_config()).await;
        assert!(cache.secure_delete(&cache.directory().join("nope.tmp")).await);
    }

    #[test]
    fn overwrite_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();

        overwrite_with_random(&path).unwrap();

        let content = std::fs::read(&path).unwrap();
        assert_eq!(content.len(), 4096);
        assert!(content.iter().any(|b| *b != 0));
    }

    #[tokio::test]
    async fn cleanup_empties_directory() {
        let (cache, _temp) = test_cache(quiet_config()).await;
        cache.store("a", ".ttf", b"aaaa").await.unwrap();
        cache.store("b", ".otf", b"bbbb").await.unwrap();
        std::fs::create_dir(cache.directory().join("nested")).unwrap();
        assert_eq!(cache.entry_count().await, 3);

        cache.cleanup().await;
        assert_eq!(cache.entry_count().await, 0);
        assert!(!cache.is_watching());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cleanup_overwrites_files_in_nested_directories() {
        let (cache, temp) = test_cache(quiet_config()).await;
        let nested = cache.directory().join("nested/deeper");
        std::fs::create_dir_all(&nested).unwrap();
        let inner = nested.join("font.tmp");
        std::fs::write(&inner, vec![0u8; 4096]).unwrap();
        // A second name for the same inode shows whether the bytes were overwritten
        let witness = temp.path().join("witness");
        std::fs::hard_link(&inner, &witness).unwrap();

        cache.cleanup().await;

        assert_eq!(cache.entry_count().await, 0);
        let content = std::fs::read(&witness).unwrap();
        assert_eq!(content.len(), 4096);
        assert!(content.iter().any(|b| *b != 0));
    }

    #[tokio::test]
    async fn cleanup_is_audited() {
        let temp = TempDir::new().unwrap();
        let audit = AuditLog::with_path(temp.path().join("audit.log"), true);
        let cache = SecureCache::new(temp.path(), quiet_config(), audit);
        cache.initialize_secure_directory().await.unwrap();
        cache.store("a", ".ttf", b"aaaa").await.unwrap();

        cache.cleanup().await;

        let log = std::fs::read_to_string(temp.path().join("audit.log")).unwrap();
        let last: serde_json::Value = serde_json::from_str(log.lines().last().unwrap()).unwrap();
        assert_eq!(last["event"], "cache.wiped");
        assert_eq!(last["removed"], 1);
        assert_eq!(last["failures"], 0);
    }

    #[tokio::test]
    async fn cleanup_tolerates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let cache = SecureCache::new(temp.path(), quiet_config(), AuditLog::disabled());
        cache.cleanup().await;
    }

    #[tokio::test]
    async fn monitor_runs_when_enabled() {
        let (cache, _temp) = test_cache(SecureCacheConfig::default()).await;
        assert!(cache.is_watching());
        assert!(cache.status().watching);
        cache.cleanup().await;
        assert!(!cache.is_watching());
    }
}
