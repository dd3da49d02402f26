//! Confirmation prompt

use super::context::UiContext;
use super::output::step_info;
use crate::error::{AgentError, AgentResult};

/// Ask a yes/no question
///
/// Pre-approved contexts answer `true` without asking. When nobody can
/// answer, `default` is used and the decision is printed so logs show it.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> AgentResult<bool> {
    if ctx.auto_yes() {
        step_info(ctx, &format!("{} yes", message));
        return Ok(true);
    }

    if !ctx.can_prompt() {
        let answer = if default { "yes" } else { "no" };
        step_info(ctx, &format!("{} {} (no terminal to ask)", message, answer));
        return Ok(default);
    }

    // cliclack blocks on the terminal
    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| AgentError::Internal(format!("prompt task failed: {}", e)))?
    .map_err(|e| AgentError::User(format!("Prompt cancelled: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pre_approved_clean_skips_prompt() {
        let ctx = UiContext::non_interactive().with_auto_yes(true);
        assert!(confirm(&ctx, "Wipe the cache?", false).await.unwrap());
    }

    #[tokio::test]
    async fn unattended_run_keeps_default() {
        let ctx = UiContext::non_interactive();
        assert!(!confirm(&ctx, "Wipe the cache?", false).await.unwrap());
        assert!(confirm(&ctx, "Wipe the cache?", true).await.unwrap());
    }
}
