//! Field-level change detection for reconciliation.

use std::fmt;

/// One field whose value would change, with the raw before/after text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

/// The set of differences a merge produced for one row.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: Vec<FieldChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change when old and new differ after trimming and case
    /// folding. The raw values are kept for display.
    pub fn record(&mut self, field: &'static str, old: &str, new: &str) {
        if normalized(old) != normalized(new) {
            self.changes.push(FieldChange {
                field,
                old: old.to_string(),
                new: new.to_string(),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn contains(&self, field: &str) -> bool {
        self.changes.iter().any(|change| change.field == field)
    }
}

fn normalized(value: &str) -> String {
    value.trim().to_lowercase()
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in &self.changes {
            writeln!(
                f,
                "  {}: '{}' -> '{}'",
                change.field, change.old, change.new
            )?;
        }
        Ok(())
    }
}
