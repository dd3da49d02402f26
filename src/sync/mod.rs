//! Font synchronization: download, validate, cache and register

pub mod download;
pub mod format;
pub mod orchestrator;

pub use download::{Downloader, HttpDownloader};
pub use format::{font_extension, sniff_font_format, FontFormat};
pub use orchestrator::{SyncFailure, SyncOrchestrator, SyncProgress, SyncResult};
