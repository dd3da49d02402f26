//! fontagent - Licensed font agent
//!
//! Keeps licensed fonts in a hidden, self-wiping cache, registers them with
//! the platform's text stack for the lifetime of the agent and unregisters
//! and destroys them on exit.

pub mod agent;
pub mod audit;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod registrar;
pub mod registry;
pub mod sync;
pub mod teardown;
pub mod ui;

pub use agent::Agent;
pub use error::{AgentError, AgentResult};
