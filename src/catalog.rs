//! Font catalog
//!
//! A catalog is the ordered list of fonts the agent should make available.
//! It comes from either a local font directory laid out as
//! `<root>/<provider>/<files>` or a JSON manifest listing entries directly.

use crate::error::{AgentError, AgentResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Provider assigned to font files placed directly in the catalog root
pub const UNKNOWN_PROVIDER: &str = "Unknown";

/// Metadata file a provider directory may carry
const PROVIDER_INFO_FILE: &str = "info.json";

/// Extensions picked up when scanning a directory without metadata
const FONT_EXTENSIONS: &[&str] = &["ttf", "otf"];

/// One font the agent can download and register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Stable font identifier
    pub id: String,

    /// Name shown to the user
    #[serde(alias = "name")]
    pub display_name: String,

    /// Where the font bytes live (`file://`, `http://` or `https://`)
    pub download_url: String,

    /// Advertised size in bytes
    #[serde(default)]
    pub file_size: u64,

    /// Provider or vendor the font belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Human-readable provider name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderInfo {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    fonts: Option<Vec<FontMeta>>,
}

#[derive(Debug, Deserialize)]
struct FontMeta {
    name: String,
    #[serde(default)]
    files: Vec<FileMeta>,
}

#[derive(Debug, Deserialize)]
struct FileMeta {
    file: String,
}

/// Load a catalog from a directory or a JSON manifest
///
/// Directory scans are sorted by provider then id; a manifest keeps the
/// order it lists entries in. When two entries share an id only the first
/// is kept.
pub async fn load(source: &Path) -> AgentResult<Vec<CatalogEntry>> {
    let metadata = fs::metadata(source).await.map_err(|e| AgentError::Catalog {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut entries = if metadata.is_dir() {
        let mut scanned = scan_directory(source).await?;
        scanned.sort_by(|a, b| {
            a.provider
                .cmp(&b.provider)
                .then_with(|| a.id.cmp(&b.id))
                .then_with(|| a.download_url.cmp(&b.download_url))
        });
        scanned
    } else {
        load_manifest(source).await?
    };

    let mut seen = HashSet::new();
    entries.retain(|entry| {
        let first = seen.insert(entry.id.clone());
        if !first {
            warn!(
                "Duplicate font id {} in catalog, ignoring {}",
                entry.id, entry.download_url
            );
        }
        first
    });

    debug!("Loaded {} catalog entries from {}", entries.len(), source.display());
    Ok(entries)
}

/// Keep only the entries named in `ids`, in catalog order
///
/// An empty selection keeps everything. Unknown ids are an error so typos
/// are not silently skipped.
pub fn select(entries: Vec<CatalogEntry>, ids: &[String]) -> AgentResult<Vec<CatalogEntry>> {
    if ids.is_empty() {
        return Ok(entries);
    }

    if let Some(missing) = ids.iter().find(|id| !entries.iter().any(|e| &e.id == *id)) {
        return Err(AgentError::FontNotFound(missing.clone()));
    }

    Ok(entries
        .into_iter()
        .filter(|entry| ids.contains(&entry.id))
        .collect())
}

/// Readable font name from a filename
///
/// `Roboto-Regular.ttf` becomes `Roboto Regular`.
pub fn derive_display_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    stem.replace(['-', '_'], " ")
}

async fn load_manifest(path: &Path) -> AgentResult<Vec<CatalogEntry>> {
    let content = fs::read_to_string(path).await.map_err(|e| AgentError::Catalog {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| AgentError::Catalog {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

async fn scan_directory(root: &Path) -> AgentResult<Vec<CatalogEntry>> {
    let mut dir = fs::read_dir(root).await.map_err(|e| AgentError::Catalog {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut entries = Vec::new();
    let mut providers = 0usize;

    while let Some(item) = dir
        .next_entry()
        .await
        .map_err(|e| AgentError::io(format!("reading {}", root.display()), e))?
    {
        let file_type = match item.file_type().await {
            Ok(t) => t,
            Err(e) => {
                warn!("Skipping {}: {}", item.path().display(), e);
                continue;
            }
        };
        let name = item.file_name().to_string_lossy().into_owned();

        if file_type.is_dir() {
            providers += 1;
            match scan_provider(&item.path(), &name).await {
                Ok(mut found) => entries.append(&mut found),
                Err(e) => warn!("Failed to scan provider directory {}: {}", name, e),
            }
        } else if file_type.is_file() && has_font_extension(&name) {
            if let Some(entry) = entry_for(&item.path(), &name, UNKNOWN_PROVIDER, None, None).await {
                entries.push(entry);
            }
        }
    }

    debug!(
        "Found {} font files across {} providers",
        entries.len(),
        providers
    );
    Ok(entries)
}

async fn scan_provider(dir: &Path, provider: &str) -> AgentResult<Vec<CatalogEntry>> {
    let info = read_provider_info(dir, provider).await;
    let provider_display = info.as_ref().and_then(|i| i.display_name.clone());
    let mut entries = Vec::new();

    if let Some(fonts) = info.and_then(|i| i.fonts) {
        for font in &fonts {
            for file in &font.files {
                let path = dir.join(&file.file);
                if fs::metadata(&path).await.is_err() {
                    warn!("{}: file not found: {}", provider, file.file);
                    continue;
                }
                if let Some(entry) = entry_for(
                    &path,
                    &file.file,
                    provider,
                    provider_display.clone(),
                    Some(&font.name),
                )
                .await
                {
                    entries.push(entry);
                }
            }
        }
        return Ok(entries);
    }

    let mut listing = fs::read_dir(dir)
        .await
        .map_err(|e| AgentError::io(format!("reading {}", dir.display()), e))?;
    while let Some(item) = listing
        .next_entry()
        .await
        .map_err(|e| AgentError::io(format!("reading {}", dir.display()), e))?
    {
        let name = item.file_name().to_string_lossy().into_owned();
        if !has_font_extension(&name) {
            continue;
        }
        if let Some(entry) =
            entry_for(&item.path(), &name, provider, provider_display.clone(), None).await
        {
            entries.push(entry);
        }
    }

    debug!("{}: {} fonts", provider, entries.len());
    Ok(entries)
}

async fn read_provider_info(dir: &Path, provider: &str) -> Option<ProviderInfo> {
    let content = fs::read_to_string(dir.join(PROVIDER_INFO_FILE)).await.ok()?;
    match serde_json::from_str(&content) {
        Ok(info) => {
            debug!("{}: loaded metadata from {}", provider, PROVIDER_INFO_FILE);
            Some(info)
        }
        Err(e) => {
            warn!("{}: ignoring malformed {}: {}", provider, PROVIDER_INFO_FILE, e);
            None
        }
    }
}

async fn entry_for(
    path: &Path,
    filename: &str,
    provider: &str,
    provider_display_name: Option<String>,
    font_name: Option<&str>,
) -> Option<CatalogEntry> {
    let metadata = match fs::metadata(path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return None,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            return None;
        }
    };

    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    Some(CatalogEntry {
        id: format!("{}-{}", provider, stem),
        display_name: font_name
            .map(str::to_string)
            .unwrap_or_else(|| derive_display_name(filename)),
        download_url: format!("file://{}", path.display()),
        file_size: metadata.len(),
        provider: Some(provider.to_string()),
        provider_display_name,
    })
}

fn has_font_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| FONT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
