//! Sync command - download, register and hold fonts until interrupted
//!
//! While fonts are held, single fonts can be toggled by typing
//! `enable <id>` or `disable <id>` on stdin.

use super::load_catalog;
use crate::agent::Agent;
use crate::catalog::{self, CatalogEntry};
use crate::cli::args::SyncArgs;
use crate::config::Config;
use crate::error::AgentResult;
use crate::sync::SyncResult;
use crate::ui::{self, SyncProgressBar, TaskSpinner, UiContext};
use std::io::BufRead;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const HOLD_USAGE: &str = "Commands: enable <id>, disable <id>, fonts, quit";

/// Commands accepted on stdin while fonts are held
#[derive(Debug, PartialEq, Eq)]
enum HoldCommand {
    Enable(String),
    Disable(String),
    Fonts,
    Quit,
}

impl HoldCommand {
    /// Parse one input line; `None` for anything unrecognized
    fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let command = match (words.next()?, words.next()) {
            ("enable", Some(id)) => Self::Enable(id.to_string()),
            ("disable", Some(id)) => Self::Disable(id.to_string()),
            ("fonts", None) => Self::Fonts,
            ("quit" | "exit", None) => Self::Quit,
            _ => return None,
        };
        words.next().is_none().then_some(command)
    }
}

/// Execute the sync command
pub async fn execute(args: SyncArgs, config: &Config) -> AgentResult<()> {
    let ctx = UiContext::detect();
    let available = load_catalog(args.source, config).await?;
    let entries = catalog::select(available.clone(), &args.fonts)?;

    ui::intro(&ctx, "Font sync");

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Starting font agent...");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let agent = match Agent::start(config, Some(tx)).await {
        Ok(agent) => agent,
        Err(e) => {
            spinner.stop_error("Font agent could not start");
            return Err(e);
        }
    };
    spinner.stop(&format!(
        "Font agent ready ({})",
        agent.manager().registrar().registrar_name()
    ));

    let mut bar = SyncProgressBar::new(&ctx, entries.len());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut interrupted = false;

    let run = agent.orchestrator().sync_all_fonts(&entries);
    tokio::pin!(run);
    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            Some(progress) = rx.recv() => bar.update(&progress),
            _ = &mut shutdown, if !interrupted => {
                interrupted = true;
                agent.orchestrator().cancel_sync();
            }
        }
    };
    while let Ok(progress) = rx.try_recv() {
        bar.update(&progress);
    }
    bar.finish();

    match outcome {
        Ok(result) => report(&ctx, &result),
        Err(e) => {
            agent.shutdown().await;
            return Err(e);
        }
    }

    if !interrupted {
        let count = agent.manager().registered_count();
        ui::remark(
            &ctx,
            &format!(
                "{} font(s) available - press Ctrl-C to remove them and exit",
                count
            ),
        );
        ui::remark(&ctx, HOLD_USAGE);

        let mut input = stdin_lines();
        let mut input_open = true;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                line = input.recv(), if input_open => {
                    let Some(line) = line else {
                        debug!("stdin closed, waiting for a signal");
                        input_open = false;
                        continue;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match HoldCommand::parse(&line) {
                        Some(HoldCommand::Quit) => break,
                        Some(command) => apply(&ctx, &agent, &available, command).await,
                        None => ui::step_warn_hint(
                            &ctx,
                            &format!("Unknown command: {}", line.trim()),
                            HOLD_USAGE,
                        ),
                    }
                }
            }
        }
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Removing fonts...");
    agent.shutdown().await;
    spinner.stop("Fonts unregistered and cache wiped");

    ui::outro_success(&ctx, "Font agent stopped");
    Ok(())
}

async fn apply(ctx: &UiContext, agent: &Agent, available: &[CatalogEntry], command: HoldCommand) {
    match command {
        HoldCommand::Enable(id) => {
            let Some(entry) = available.iter().find(|e| e.id == id) else {
                ui::step_warn(ctx, &format!("Font not found: {}", id));
                return;
            };
            match agent.enable_font(entry).await {
                Ok(()) => ui::step_ok(ctx, &format!("Enabled {}", entry.display_name)),
                Err(e) => ui::step_error_detail(ctx, &entry.display_name, &e.to_string()),
            }
        }
        HoldCommand::Disable(id) => match agent.disable_font(&id).await {
            Ok(()) => ui::step_ok(ctx, &format!("Disabled {}", id)),
            Err(e) => ui::step_error_detail(ctx, &id, &e.to_string()),
        },
        HoldCommand::Fonts => {
            let fonts = agent.manager().get_registered_fonts();
            if fonts.is_empty() {
                ui::step_info(ctx, "No fonts registered");
            }
            for record in fonts {
                ui::key_value(ctx, &record.id, &record.display_name);
            }
        }
        HoldCommand::Quit => {}
    }
}

/// Read stdin on a dedicated thread
///
/// A blocking read on the runtime's pool would keep the process alive after
/// shutdown.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn report(ctx: &UiContext, result: &SyncResult) {
    if result.success_count > 0 {
        ui::step_ok(ctx, &format!("{} font(s) synced", result.success_count));
    }
    for failure in &result.errors {
        ui::step_error_detail(ctx, &failure.label, &failure.error);
    }
    if result.cancelled {
        ui::step_warn(ctx, "Sync cancelled before all fonts were processed");
    } else if result.failed_count > 0 {
        ui::step_warn_hint(
            ctx,
            &format!("{} font(s) failed", result.failed_count),
            "Run sync again to retry",
        );
    }
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
