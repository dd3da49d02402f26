//! Output mode detection
//!
//! Spinners and the progress bar are drawn only when a person is watching
//! stdout. Pipes, CI runners, `NO_COLOR` and `FONTAGENT_PLAIN` switch to one
//! plain line per event. `FONTAGENT_ASSUME_YES` answers prompts, so an
//! unattended `fontagent clean` can run from a login script.

use std::io::IsTerminal;

/// Forces plain output even on a terminal
const PLAIN_VAR: &str = "FONTAGENT_PLAIN";

/// Pre-approves every confirmation prompt
const ASSUME_YES_VAR: &str = "FONTAGENT_ASSUME_YES";

/// Variables set by common CI runners
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// How the current command may talk to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiContext {
    fancy: bool,
    prompts: bool,
    auto_yes: bool,
}

impl UiContext {
    /// Detect from the process's terminals and environment
    pub fn detect() -> Self {
        Self::resolve(
            std::io::stdout().is_terminal(),
            std::io::stdin().is_terminal(),
            |name| std::env::var_os(name).is_some_and(|v| !v.is_empty()),
        )
    }

    /// Plain output, no prompts
    pub fn non_interactive() -> Self {
        Self {
            fancy: false,
            prompts: false,
            auto_yes: false,
        }
    }

    /// Pre-approve prompts (`--yes`); an environment approval is kept
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes |= yes;
        self
    }

    /// Whether a confirmation can be asked and answered
    pub fn can_prompt(&self) -> bool {
        self.prompts
    }

    /// Whether prompts are pre-approved
    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Whether spinners, bars and styled output are drawn
    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }

    fn resolve(stdout_tty: bool, stdin_tty: bool, is_set: impl Fn(&str) -> bool) -> Self {
        let automated = CI_VARS.iter().any(|var| is_set(var));
        let plain = is_set("NO_COLOR") || is_set(PLAIN_VAR);
        Self {
            fancy: stdout_tty && !automated && !plain,
            prompts: stdout_tty && stdin_tty && !automated,
            auto_yes: is_set(ASSUME_YES_VAR),
        }
    }
}
