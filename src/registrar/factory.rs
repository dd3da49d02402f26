//! Registrar factory
//!
//! Picks the registration backend for the current platform. Only one
//! backend exists; every other platform reports the capability as missing,
//! which is fatal at startup.

use crate::error::{AgentError, AgentResult};
use crate::registrar::runtime::FontRegistrar;
use std::sync::Arc;

/// Detected platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux - fontconfig user fonts
    Linux,
    /// Anything else
    Unsupported,
}

impl Platform {
    /// Detect the current platform
    pub fn detect() -> Self {
        match std::env::consts::OS {
            "linux" => Platform::Linux,
            _ => Platform::Unsupported,
        }
    }

    /// Get a human-readable platform name
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Linux => "Linux",
            Platform::Unsupported => "Unsupported",
        }
    }
}

/// Create the registrar for the current platform
pub fn create_registrar() -> AgentResult<Arc<dyn FontRegistrar>> {
    match Platform::detect() {
        #[cfg(target_os = "linux")]
        Platform::Linux => Ok(Arc::new(
            crate::registrar::fontconfig::FontconfigRegistrar::default(),
        )),
        _ => Err(AgentError::RegistrarUnavailable(
            std::env::consts::OS.to_string(),
        )),
    }
}

/// Create the registrar and verify it can be used
pub async fn create_available_registrar() -> AgentResult<Arc<dyn FontRegistrar>> {
    let registrar = create_registrar()?;
    if !registrar.is_available().await {
        return Err(AgentError::RegistrarUnavailable(format!(
            "{} backend not usable",
            registrar.registrar_name()
        )));
    }
    Ok(registrar)
}
