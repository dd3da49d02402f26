//! fontconfig registration backend for Linux
//!
//! fontconfig scans `~/.local/share/fonts` recursively. Registering a font
//! links the cached file into a dedicated hidden subdirectory there and
//! refreshes the fontconfig cache for that subdirectory only. The
//! subdirectory holds nothing but this agent's links, which makes
//! `unregister_all` a sweep of that directory.

use crate::error::{AgentError, AgentResult};
use crate::registrar::runtime::{FontRegistrar, UnregisterSummary};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Cache refresh tool
const FC_CACHE: &str = "fc-cache";

/// Registrar backed by fontconfig user font directories
#[derive(Debug, Clone)]
pub struct FontconfigRegistrar {
    fonts_dir: PathBuf,
    refresh_command: Option<String>,
}

impl FontconfigRegistrar {
    /// Create a registrar linking into `fonts_dir`
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
            refresh_command: Some(FC_CACHE.to_string()),
        }
    }

    /// Default link directory: `~/.local/share/fonts/.fontagent`
    pub fn default_fonts_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fonts")
            .join(".fontagent")
    }

    /// Skip `fc-cache` refreshes (links only)
    pub fn without_refresh(mut self) -> Self {
        self.refresh_command = None;
        self
    }

    /// Refresh with `command` instead of `fc-cache`
    pub fn with_refresh_command(mut self, command: impl Into<String>) -> Self {
        self.refresh_command = Some(command.into());
        self
    }

    /// Directory holding the registration links
    pub fn fonts_dir(&self) -> &Path {
        &self.fonts_dir
    }

    fn link_path(&self, font: &Path) -> AgentResult<PathBuf> {
        let name = font.file_name().ok_or_else(|| AgentError::PathInvalid {
            path: font.to_path_buf(),
            reason: "no file name".to_string(),
        })?;
        Ok(self.fonts_dir.join(name))
    }

    /// Rebuild the fontconfig cache for the link directory
    async fn refresh_cache(&self) -> AgentResult<()> {
        let Some(command) = &self.refresh_command else {
            return Ok(());
        };

        debug!("Executing: {} -f {}", command, self.fonts_dir.display());
        let output = Command::new(command)
            .arg("-f")
            .arg(&self.fonts_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AgentError::command_failed(command.as_str(), e))?;

        if !output.status.success() {
            return Err(AgentError::command_exec(
                command.as_str(),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(())
    }

    async fn remove_link(&self, link: &Path) -> std::io::Result<bool> {
        match fs::remove_file(link).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl Default for FontconfigRegistrar {
    fn default() -> Self {
        Self::new(Self::default_fonts_dir())
    }
}

#[async_trait]
impl FontRegistrar for FontconfigRegistrar {
    async fn is_available(&self) -> bool {
        let Some(command) = &self.refresh_command else {
            return true;
        };
        Command::new(command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn register(&self, path: &Path) -> AgentResult<bool> {
        fs::create_dir_all(&self.fonts_dir).await.map_err(|e| {
            AgentError::io(format!("creating {}", self.fonts_dir.display()), e)
        })?;

        let link = self.link_path(path)?;
        self.remove_link(&link)
            .await
            .map_err(|e| AgentError::io(format!("replacing {}", link.display()), e))?;
        fs::symlink(path, &link)
            .await
            .map_err(|e| AgentError::io(format!("linking {}", link.display()), e))?;

        if let Err(e) = self.refresh_cache().await {
            warn!("fontconfig refresh failed, withdrawing {}: {}", link.display(), e);
            let _ = self.remove_link(&link).await;
            return Ok(false);
        }

        debug!("Registered {} via {}", path.display(), link.display());
        Ok(true)
    }

    async fn unregister(&self, path: &Path) -> AgentResult<bool> {
        let link = self.link_path(path)?;
        let removed = self
            .remove_link(&link)
            .await
            .map_err(|e| AgentError::io(format!("removing {}", link.display()), e))?;
        if !removed {
            debug!("No registration link for {}", path.display());
            return Ok(false);
        }

        self.refresh_cache().await?;
        Ok(true)
    }

    async fn unregister_all(&self) -> AgentResult<UnregisterSummary> {
        let mut summary = UnregisterSummary::default();
        let mut entries = match fs::read_dir(&self.fonts_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(summary),
            Err(e) => {
                return Err(AgentError::io(
                    format!("reading {}", self.fonts_dir.display()),
                    e,
                ))
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AgentError::io("reading registration entry", e))?
        {
            match self.remove_link(&entry.path()).await {
                Ok(_) => summary.success += 1,
                Err(e) => {
                    warn!("Failed to remove {}: {}", entry.path().display(), e);
                    summary.failed += 1;
                }
            }
        }

        // Links are already gone; a failed refresh only warns
        if summary.success > 0 {
            if let Err(e) = self.refresh_cache().await {
                warn!("fontconfig refresh after sweep failed: {}", e);
            }
        }

        info!(
            "Unregistered fonts - Success: {}, Failed: {}",
            summary.success, summary.failed
        );
        Ok(summary)
    }

    fn registrar_name(&self) -> &'static str {
        "fontconfig"
    }
}
