//! UI module for consistent CLI output
//!
//! Uses `cliclack` for interactive prompts and spinners with automatic
//! fallback to plain output in CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use fontagent::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect().with_auto_yes(args.yes);
//!
//! ui::intro(&ctx, "Font sync");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Starting font agent...");
//! // ... do work ...
//! spinner.stop("Font agent ready");
//!
//! let yes = ui::confirm(&ctx, "Remove leftover fonts?", false).await?;
//!
//! ui::outro_success(&ctx, "Done");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    format_bytes, intro, key_value, key_value_status, outro_success, outro_warn, remark, section,
    step_error_detail, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{SyncProgressBar, TaskSpinner};
pub use prompts::confirm;
