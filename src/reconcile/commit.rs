//! Commit strategies for reconciled rows.
//!
//! Whether a change-set is applied silently or after operator confirmation
//! is explicit configuration, never inferred.

use std::io::{self, BufRead, Write};

use clap::ValueEnum;
use tracing::info;

use super::changeset::ChangeSet;

/// Decides whether a computed change-set is applied to its row.
pub trait CommitStrategy {
    fn confirm(&self, row_label: &str, changes: &ChangeSet) -> bool;
}

/// Applies every change-set without asking. Batch mode.
pub struct AutoApply;

impl CommitStrategy for AutoApply {
    fn confirm(&self, row_label: &str, changes: &ChangeSet) -> bool {
        info!("applying {} change(s) to {row_label}:\n{changes}", changes.len());
        true
    }
}

/// Shows the change-set and asks for confirmation on stdin.
pub struct PromptConfirm;

impl CommitStrategy for PromptConfirm {
    fn confirm(&self, row_label: &str, changes: &ChangeSet) -> bool {
        println!("\n{row_label}");
        print!("{changes}Apply these changes? [y/N] ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// How reconciliation commits changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CommitMode {
    /// Apply every change-set silently.
    Auto,
    /// Show each change-set and ask before applying.
    Confirm,
}

impl CommitMode {
    pub fn strategy(&self) -> Box<dyn CommitStrategy> {
        match self {
            CommitMode::Auto => Box::new(AutoApply),
            CommitMode::Confirm => Box::new(PromptConfirm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_apply_always_confirms() {
        let mut changes = ChangeSet::new();
        changes.record("title", "a", "b");
        assert!(AutoApply.confirm("Some Album (row 1)", &changes));
    }
}
