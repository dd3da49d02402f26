//! Error types for fontagent
//!
//! All modules use `AgentResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fontagent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Coarse error classes used to decide how a failure propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required input was missing or malformed
    Precondition,
    /// The registration capability refused the request
    Capability,
    /// The requested font is unknown
    NotFound,
    /// Network or disk hiccup; the item can be retried
    TransientIo,
    /// The agent cannot start at all
    FatalStartup,
    /// Everything else
    Other,
}

/// All errors that can occur in fontagent
#[derive(Error, Debug)]
pub enum AgentError {
    // Startup errors
    #[error("Font registration capability unavailable: {0}")]
    RegistrarUnavailable(String),

    #[error("Failed to create secure cache directory {path}: {source}")]
    CacheInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Registration errors
    #[error("Font file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid font id: {0:?}")]
    InvalidFontId(String),

    #[error("Font already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Failed to register font {name}: {reason}")]
    Registration { name: String, reason: String },

    #[error("Failed to unregister font {id}: {reason}")]
    Unregistration { id: String, reason: String },

    #[error("Font not found: {0}")]
    FontNotFound(String),

    // Sync errors
    #[error("Synchronization already in progress")]
    SyncInProgress,

    #[error("Font agent is shutting down")]
    ShuttingDown,

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Download of {url} timed out after {secs}s")]
    DownloadTimeout { url: String, secs: u64 },

    #[error("Unsupported font format: {0}")]
    UnsupportedFormat(String),

    // Catalog errors
    #[error("Invalid catalog at {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },

    #[error("No font catalog source configured")]
    CatalogSourceMissing,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path: {path}: {reason}")]
    PathInvalid { path: PathBuf, reason: String },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl AgentError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a registration error
    pub fn registration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Registration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a download error
    pub fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RegistrarUnavailable(_) | Self::CacheInit { .. } => ErrorKind::FatalStartup,
            Self::FileNotFound(_)
            | Self::InvalidFontId(_)
            | Self::AlreadyRegistered(_)
            | Self::UnsupportedFormat(_)
            | Self::CatalogSourceMissing
            | Self::SyncInProgress
            | Self::ShuttingDown => ErrorKind::Precondition,
            Self::Registration { .. } | Self::Unregistration { .. } => ErrorKind::Capability,
            Self::FontNotFound(_) => ErrorKind::NotFound,
            Self::Download { .. } | Self::DownloadTimeout { .. } | Self::Io { .. } => {
                ErrorKind::TransientIo
            }
            _ => ErrorKind::Other,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unregistration { .. }
                | Self::Download { .. }
                | Self::DownloadTimeout { .. }
                | Self::SyncInProgress
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RegistrarUnavailable(_) => {
                Some("Install fontconfig (fc-cache) - only Linux is supported")
            }
            Self::CacheInit { .. } => Some("Check permissions on the data directory"),
            Self::SyncInProgress => Some("Wait for the running sync to finish"),
            Self::DownloadTimeout { .. } => Some("Raise sync.download_timeout_secs in config"),
            Self::CatalogSourceMissing => {
                Some("Pass --source or set catalog.source in the config file")
            }
            _ => None,
        }
    }
}
