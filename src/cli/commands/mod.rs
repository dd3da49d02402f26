//! CLI command implementations

pub mod clean;
pub mod config;
pub mod list;
pub mod status;
pub mod sync;

pub use clean::execute as clean;
pub use config::execute as config;
pub use list::execute as list;
pub use status::execute as status;
pub use sync::execute as sync;

use crate::catalog::{self, CatalogEntry};
use crate::config::Config;
use crate::error::{AgentError, AgentResult};
use std::path::PathBuf;

/// Catalog source from the command line, else from config
fn catalog_source(arg: Option<PathBuf>, config: &Config) -> AgentResult<PathBuf> {
    arg.or_else(|| config.catalog.source.clone())
        .ok_or(AgentError::CatalogSourceMissing)
}

async fn load_catalog(arg: Option<PathBuf>, config: &Config) -> AgentResult<Vec<CatalogEntry>> {
    let source = catalog_source(arg, config)?;
    catalog::load(&source).await
}
