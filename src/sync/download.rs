//! Font downloads
//!
//! `http(s)://` URLs go through a blocking `ureq` agent on the blocking pool;
//! `file://` URLs are read straight from disk.

use crate::config::schema::SyncConfig;
use crate::error::{AgentError, AgentResult};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Default cap on a downloaded font body (64 MiB)
pub const DEFAULT_MAX_FONT_BYTES: u64 = 64 * 1024 * 1024;

const USER_AGENT: &str = concat!("fontagent/", env!("CARGO_PKG_VERSION"));

/// Fetches font bytes from a URL
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download the whole body at `url`, giving up after `timeout`
    async fn fetch(&self, url: &str, timeout: Duration) -> AgentResult<Vec<u8>>;
}

/// Production downloader for `http://`, `https://` and `file://` URLs
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    max_bytes: u64,
}

impl HttpDownloader {
    /// Create a downloader that refuses bodies larger than `max_bytes`
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Largest accepted body
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FONT_BYTES)
    }
}

impl From<&SyncConfig> for HttpDownloader {
    fn from(config: &SyncConfig) -> Self {
        Self::new(config.max_font_bytes)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str, timeout: Duration) -> AgentResult<Vec<u8>> {
        debug!("Downloading {}", url);

        if let Some(path) = url.strip_prefix("file://") {
            return read_local(url, Path::new(path), self.max_bytes).await;
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AgentError::download(url, "unsupported URL scheme"));
        }

        let owned = url.to_string();
        let max_bytes = self.max_bytes;
        let request = tokio::task::spawn_blocking(move || fetch_http(&owned, timeout, max_bytes));

        // ureq enforces the same deadline; this bounds the wait if it does not
        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AgentError::Internal(format!("download task failed: {}", e))),
            Err(_) => Err(AgentError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout.as_secs(),
            }),
        }
    }
}

async fn read_local(url: &str, path: &Path, max_bytes: u64) -> AgentResult<Vec<u8>> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| AgentError::download(url, e))?;
    if !metadata.is_file() {
        return Err(AgentError::download(url, "not a regular file"));
    }
    if metadata.len() > max_bytes {
        return Err(AgentError::download(
            url,
            format!("{} bytes exceeds limit of {}", metadata.len(), max_bytes),
        ));
    }
    fs::read(path).await.map_err(|e| AgentError::download(url, e))
}

fn fetch_http(url: &str, timeout: Duration, max_bytes: u64) -> AgentResult<Vec<u8>> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into();

    let map_err = |e: ureq::Error| match e {
        ureq::Error::Timeout(_) => AgentError::DownloadTimeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        },
        other => AgentError::download(url, other),
    };

    agent
        .get(url)
        .header("User-Agent", USER_AGENT)
        .call()
        .map_err(map_err)?
        .into_body()
        .with_config()
        .limit(max_bytes)
        .read_to_vec()
        .map_err(map_err)
}
