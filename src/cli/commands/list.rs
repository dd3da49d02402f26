//! List command - show fonts in the catalog

use super::load_catalog;
use crate::catalog::CatalogEntry;
use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::AgentResult;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> AgentResult<()> {
    let entries = load_catalog(args.source, config).await?;

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No fonts in catalog");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[CatalogEntry]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Font catalog");

    println!(
        "{:<32} {:<28} {:<20} {:>10}",
        style("ID").bold(),
        style("NAME").bold(),
        style("PROVIDER").bold(),
        style("SIZE").bold()
    );
    println!("{}", "-".repeat(93));

    for entry in entries {
        let provider = entry
            .provider_display_name
            .as_deref()
            .or(entry.provider.as_deref())
            .unwrap_or("-");

        println!(
            "{:<32} {:<28} {:<20} {:>10}",
            entry.id,
            entry.display_name,
            provider,
            ui::format_bytes(entry.file_size)
        );
    }

    println!();
    println!("{} font(s)", entries.len());
}

fn print_json(entries: &[CatalogEntry]) -> AgentResult<()> {
    let json = serde_json::to_string_pretty(entries)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(entries: &[CatalogEntry]) {
    for entry in entries {
        println!("{}", entry.id);
    }
}
