//! Config command - show the effective configuration or write a starter file

use crate::catalog;
use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::AgentResult;
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> AgentResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config, manager)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force, source }) => init_config(manager, force, source).await?,
    }

    Ok(())
}

/// Print the configuration in effect, defaults filled in
fn show_config(config: &Config, manager: &ConfigManager) -> AgentResult<()> {
    let origin = if manager.path().exists() {
        manager.path().display().to_string()
    } else {
        "built-in defaults".to_string()
    };
    println!("# fontagent configuration from {}", origin);
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(
    manager: &ConfigManager,
    force: bool,
    source: Option<PathBuf>,
) -> AgentResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    let mut config = Config::default();
    if let Some(source) = source {
        // Refuse a catalog that would fail on the first sync
        let entries = catalog::load(&source).await?;
        ui::step_ok_detail(
            &ctx,
            &format!("Catalog has {} font(s)", entries.len()),
            &source.display().to_string(),
        );
        config.catalog.source = Some(source);
    }
    manager.save(&config).await?;

    ui::step_ok_detail(
        &ctx,
        "Configuration written",
        &path.display().to_string(),
    );
    if config.catalog.source.is_none() {
        ui::remark(
            &ctx,
            "Set catalog.source (or pass --source to sync and list) to point at your fonts",
        );
    }

    Ok(())
}
