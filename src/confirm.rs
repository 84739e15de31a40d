//! Interactive confirmation before billable or destructive changes.

use std::io::Write;

use crate::error::Result;

/// Asks the operator to approve an action.
pub trait ConfirmationGate: Send + Sync {
    /// Returns true if the action may proceed.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Prompts on stderr and reads the answer from stdin. Only `y` or `yes`
/// approves.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmation;

impl ConfirmationGate for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        eprint!("{prompt} [y/N]: ");
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        Ok(is_affirmative(&input))
    }
}

/// Approves everything (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl ConfirmationGate for AutoApprove {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
