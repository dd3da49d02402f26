//! Registered font bookkeeping

pub mod manager;
pub mod record;

pub use manager::FontLifecycleManager;
pub use record::FontRecord;
