//! Line output for fontagent commands
//!
//! Every step goes through [`emit`], which draws a cliclack log line on a
//! terminal and a tagged plain line (`[OK]`, `[WARN]`, ...) otherwise, so
//! logs from unattended runs can be grepped by tag.

use super::context::UiContext;
use console::{style, Style};

/// Severity of a step line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Warn => "[WARN]",
            Self::Fail => "[FAIL]",
            Self::Info => "[INFO]",
        }
    }

    fn style(self) -> Style {
        match self {
            Self::Ok => Style::new().green(),
            Self::Warn => Style::new().yellow(),
            Self::Fail => Style::new().red(),
            Self::Info => Style::new().cyan(),
        }
    }
}

fn emit(ctx: &UiContext, level: Level, text: &str) {
    if ctx.use_fancy_output() {
        let _ = match level {
            Level::Ok => cliclack::log::success(text),
            Level::Warn => cliclack::log::warning(text),
            Level::Fail => cliclack::log::error(text),
            Level::Info => cliclack::log::info(text),
        };
    } else {
        println!("  {} {}", level.style().apply_to(level.tag()), text);
    }
}

/// Command title
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::intro(style(title).cyan().bold());
    } else {
        println!("{}", style(title).cyan().bold());
        println!();
    }
}

/// Final line of a command that did everything it set out to
pub fn outro_success(ctx: &UiContext, message: &str) {
    outro(ctx, Level::Ok, message);
}

/// Final line of a command that finished with leftovers or failures
pub fn outro_warn(ctx: &UiContext, message: &str) {
    outro(ctx, Level::Warn, message);
}

fn outro(ctx: &UiContext, level: Level, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::outro(level.style().bold().apply_to(message));
    } else {
        println!();
        println!("{} {}", level.style().apply_to(level.tag()), message);
    }
}

/// Group header, e.g. "Secure cache" in `status`
pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        let _ = cliclack::log::info(style(title).bold());
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Ok, message);
}

/// Success with a secondary detail such as a path
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    let detail = if ctx.use_fancy_output() {
        style(detail).dim().to_string()
    } else {
        detail.to_string()
    };
    emit(ctx, Level::Ok, &format!("{} ({})", message, detail));
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Warn, message);
}

/// Warning followed by what to do about it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    let hint = if ctx.use_fancy_output() {
        style(hint).dim().to_string()
    } else {
        hint.to_string()
    };
    emit(ctx, Level::Warn, &format!("{} - {}", message, hint));
}

/// A font (or step) that failed, with the reason
pub fn step_error_detail(ctx: &UiContext, subject: &str, reason: &str) {
    emit(ctx, Level::Fail, &format!("{}: {}", subject, reason));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    emit(ctx, Level::Info, message);
}

/// Untagged, dimmed note
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::log::remark(message);
    } else {
        println!("  {}", style(message).dim());
    }
}

/// Font sizes for listings: `512 B`, `1.5 KB`, `3.2 MB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `key: value` row
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// `key: value` row colored (or tagged) by whether the check passed
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    let level = if ok { Level::Ok } else { Level::Warn };
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), level.style().apply_to(value));
    } else {
        println!("  {} {}: {}", level.tag(), key, value);
    }
}
