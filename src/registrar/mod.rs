//! Native font registration
//!
//! Abstracts the platform's font registration behind the `FontRegistrar`
//! trait. The Linux backend uses fontconfig user font directories.

pub mod factory;
#[cfg(target_os = "linux")]
pub mod fontconfig;
pub mod runtime;

pub use factory::{create_available_registrar, create_registrar, Platform};
#[cfg(target_os = "linux")]
pub use fontconfig::FontconfigRegistrar;
pub use runtime::{FontRegistrar, UnregisterSummary};
