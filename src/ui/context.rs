//! Terminal detection for choosing between rich and plain output

use std::io::IsTerminal;

/// Environment variables set by common CI providers
const CI_ENV_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// How output should be rendered and whether prompts may be shown
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    interactive: bool,
    assume_yes: bool,
}

impl UiContext {
    /// Inspect the current process environment
    pub fn detect() -> Self {
        let tty = std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
        let in_ci = CI_ENV_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self {
            interactive: tty && !in_ci,
            assume_yes: false,
        }
    }

    /// Plain output, no prompts
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            assume_yes: false,
        }
    }

    /// Answer yes to every prompt
    pub fn with_assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    /// Whether prompts and spinners can be shown
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Whether prompts are pre-approved
    pub fn assume_yes(&self) -> bool {
        self.assume_yes
    }
}
