//! Merging canonical metadata into worksheet rows under a deterministic
//! field policy, with explicit change detection.

mod changeset;
mod commit;
mod engine;

pub use changeset::{ChangeSet, FieldChange};
pub use commit::{AutoApply, CommitMode, CommitStrategy, PromptConfirm};
pub use engine::{BatchError, BatchStats, ReconciliationEngine};
