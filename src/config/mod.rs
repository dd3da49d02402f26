//! Configuration for fontagent
//!
//! A missing file means defaults. A present file is parsed, relative paths
//! in it are anchored at the file's directory, and values that would make
//! the agent misbehave (zero timeouts, unknown log formats) are rejected at
//! load time instead of at the first sync.

pub mod schema;

pub use schema::Config;

use crate::error::{AgentError, AgentResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const LOG_FORMATS: &[&str] = &["text", "json"];

/// Locates, loads and writes the config file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for `~/.config/fontagent/config.toml`
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Manager for an explicit file (`--config` / `FONTAGENT_CONFIG`)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fontagent")
            .join("config.toml")
    }

    /// Per-user state: audit log and the default cache base
    pub fn state_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fontagent")
    }

    pub fn audit_log_path() -> PathBuf {
        Self::state_dir().join("audit.log")
    }

    /// Base directory the hidden cache chain nests under
    pub fn cache_base_dir(config: &Config) -> PathBuf {
        config
            .cache
            .base_dir
            .clone()
            .unwrap_or_else(Self::state_dir)
    }

    /// Load the file, or defaults when there is none
    pub async fn load(&self) -> AgentResult<Config> {
        if !self.config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            AgentError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| self.invalid(e))?;

        if let Some(dir) = self.config_path.parent() {
            anchor_paths(&mut config, dir);
        }
        validate(&config).map_err(|reason| self.invalid(reason))?;
        Ok(config)
    }

    /// Write `config`, creating the directory if needed
    pub async fn save(&self, config: &Config) -> AgentResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AgentError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            AgentError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn invalid(&self, reason: impl ToString) -> AgentError {
        AgentError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve relative `catalog.source` and `cache.base_dir` against `dir`
fn anchor_paths(config: &mut Config, dir: &Path) {
    for path in [&mut config.catalog.source, &mut config.cache.base_dir]
        .into_iter()
        .flatten()
    {
        if path.is_relative() {
            *path = dir.join(&*path);
        }
    }
}

fn validate(config: &Config) -> Result<(), String> {
    if !LOG_FORMATS.contains(&config.general.log_format.as_str()) {
        return Err(format!(
            "general.log_format must be one of {:?}, got {:?}",
            LOG_FORMATS, config.general.log_format
        ));
    }
    if config.sync.download_timeout_secs == 0 {
        return Err("sync.download_timeout_secs must be at least 1".to_string());
    }
    if config.sync.max_font_bytes == 0 {
        return Err("sync.max_font_bytes must be at least 1".to_string());
    }
    if config.cache.enable_file_watcher && config.cache.watcher_sensitivity_ms == 0 {
        return Err("cache.watcher_sensitivity_ms must be positive while the watcher is on".to_string());
    }
    Ok(())
}
