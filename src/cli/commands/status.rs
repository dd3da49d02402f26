//! Status command - check platform support and cache state

use crate::agent;
use crate::config::{Config, ConfigManager};
use crate::error::AgentResult;
use crate::registrar::{create_registrar, Platform};
use crate::ui::{self, UiContext};

/// Execute the status command
pub async fn execute(config: &Config) -> AgentResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "fontagent status");

    let mut all_ok = true;
    let platform = Platform::detect();

    ui::section(&ctx, "Platform");
    ui::key_value_status(
        &ctx,
        "Detected",
        platform.name(),
        platform != Platform::Unsupported,
    );

    match create_registrar() {
        Ok(registrar) => {
            let available = registrar.is_available().await;
            let state = if available { "available" } else { "not usable" };
            ui::key_value_status(
                &ctx,
                "Registrar",
                &format!("{} ({})", registrar.registrar_name(), state),
                available,
            );
            all_ok &= available;
        }
        Err(e) => {
            ui::key_value_status(&ctx, "Registrar", &e.to_string(), false);
            all_ok = false;
        }
    }

    ui::section(&ctx, "Secure cache");
    let cache = agent::secure_cache(config);
    let status = cache.status();
    ui::key_value(&ctx, "Directory", &status.directory.display().to_string());
    let leftovers = cache.entry_count().await;
    ui::key_value_status(&ctx, "Leftover entries", &leftovers.to_string(), leftovers == 0);
    if leftovers > 0 {
        all_ok = false;
    }
    ui::key_value(&ctx, "Access monitor", on_off(status.config.enable_file_watcher));
    ui::key_value(&ctx, "Obfuscated names", on_off(status.config.enable_obfuscation));
    ui::key_value(
        &ctx,
        "Permission hardening",
        on_off(status.config.enable_permission_hardening),
    );

    ui::section(&ctx, "Configuration");
    let source = config
        .catalog
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string());
    ui::key_value(&ctx, "Catalog source", &source);
    ui::key_value(
        &ctx,
        "Download timeout",
        &format!("{}s", config.sync.download_timeout_secs),
    );
    ui::key_value(
        &ctx,
        "Audit log",
        &if config.general.audit_log {
            ConfigManager::audit_log_path().display().to_string()
        } else {
            "off".to_string()
        },
    );

    if all_ok {
        ui::outro_success(&ctx, "Ready to sync fonts");
    } else if leftovers > 0 {
        ui::step_warn_hint(
            &ctx,
            "Fonts from an earlier run are still cached",
            "Run: fontagent clean",
        );
        ui::outro_warn(&ctx, "Some checks failed - see above for details");
    } else {
        ui::outro_warn(&ctx, "Some checks failed - see above for details");
    }

    Ok(())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
