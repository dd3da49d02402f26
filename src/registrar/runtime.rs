//! Font registration capability abstraction
//!
//! The operating system's text stack is an opaque collaborator. This trait is
//! the only way the rest of the agent talks to it, so tests and future
//! backends can swap in their own implementation.

use crate::error::AgentResult;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// Outcome of a bulk unregistration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnregisterSummary {
    /// Registrations removed
    pub success: usize,
    /// Registrations that could not be removed
    pub failed: usize,
}

/// Native font registration interface
///
/// Registrations are scoped to the agent's session: `unregister_all` must
/// remove everything this agent ever registered, including registrations
/// left behind by an earlier process that did not shut down cleanly.
#[async_trait]
pub trait FontRegistrar: Send + Sync {
    /// Check if the capability is usable on this system
    async fn is_available(&self) -> bool;

    /// Make the font file at `path` available to text rendering
    ///
    /// `Ok(false)` means the capability refused the font.
    async fn register(&self, path: &Path) -> AgentResult<bool>;

    /// Withdraw a font previously registered from `path`
    async fn unregister(&self, path: &Path) -> AgentResult<bool>;

    /// Withdraw every font registered by this agent
    async fn unregister_all(&self) -> AgentResult<UnregisterSummary>;

    /// Get the human-readable backend name for display
    fn registrar_name(&self) -> &'static str;
}
