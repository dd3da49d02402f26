//! Clean command - remove fonts left behind by a crashed run

use crate::agent::{self, Agent};
use crate::cli::args::CleanArgs;
use crate::config::Config;
use crate::error::AgentResult;
use crate::registrar::create_available_registrar;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the clean command
pub async fn execute(args: CleanArgs, config: &Config) -> AgentResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    ui::intro(&ctx, "Clean up leftover fonts");

    let registrar = create_available_registrar().await?;
    let leftovers = agent::secure_cache(config).entry_count().await;
    ui::key_value(&ctx, "Cached files", &leftovers.to_string());

    let prompt = format!(
        "Unregister all {} fonts and wipe the cache?",
        registrar.registrar_name()
    );
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_info(&ctx, "Nothing removed");
        return Ok(());
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Removing leftover fonts...");
    let report = Agent::reclaim(config, registrar.as_ref()).await;

    if report.unregister_failed > 0 || report.cache_entries_left > 0 {
        spinner.stop_warn("Cleanup finished with leftovers");
        ui::step_warn_hint(
            &ctx,
            &format!(
                "{} registration(s) and {} file(s) remain",
                report.unregister_failed, report.cache_entries_left
            ),
            "Re-run with -vv for details",
        );
        ui::outro_warn(&ctx, "Cleanup incomplete");
        return Ok(());
    }

    spinner.stop("Leftover fonts removed");
    ui::step_ok_detail(
        &ctx,
        &format!("{} registration(s) withdrawn", report.unregistered),
        &format!("{} cached file(s) wiped", report.cache_entries),
    );
    ui::outro_success(&ctx, "Clean");
    Ok(())
}
