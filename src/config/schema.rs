//! Configuration schema for fontagent
//!
//! Configuration is stored at `~/.config/fontagent/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Secure cache settings
    pub cache: CacheConfig,

    /// Synchronization settings
    pub sync: SyncConfig,

    /// Font catalog settings
    pub catalog: CatalogConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Secure cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base directory for the hidden cache (defaults to the state directory)
    pub base_dir: Option<PathBuf>,

    /// Watch the cache directory for suspicious access
    pub enable_file_watcher: bool,

    /// Store fonts under hash-derived filenames
    pub enable_obfuscation: bool,

    /// Restrict cache directories to the owner
    pub enable_permission_hardening: bool,

    /// Window used by the access monitor, in milliseconds
    pub watcher_sensitivity_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            enable_file_watcher: true,
            enable_obfuscation: true,
            enable_permission_hardening: true,
            watcher_sensitivity_ms: 2000,
        }
    }
}

/// Synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Per-download timeout in seconds
    pub download_timeout_secs: u64,

    /// Largest font body accepted from a remote server
    pub max_font_bytes: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: 60,
            max_font_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Font catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directory to scan or JSON manifest to read
    pub source: Option<PathBuf>,
}
