//! Secure font cache
//!
//! Provides:
//! - A hidden, owner-only directory for downloaded font bytes
//! - Per-session obfuscated filenames
//! - Overwrite-then-unlink deletion and total-effort cleanup
//! - A detection-only access monitor backed by `notify`

pub mod monitor;
pub mod naming;
pub mod secure;

pub use monitor::AccessMonitor;
pub use naming::SessionSalt;
pub use secure::{CacheStatus, SecureCache, SecureCacheConfig};
