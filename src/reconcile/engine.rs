//! Reconciliation of worksheet rows against canonical metadata.
//!
//! Rows carrying an external reference move from needs-metadata to
//! reconciled in a single merge; rows without one only get their descriptor
//! cells tidied.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::discogs::{
    clean_artist_name, normalize_link, CacheError, CanonicalRef, LinkError, MetadataCache,
    MetadataSource, NormalizeError, ResolvedMetadata,
};
use crate::sheet::{join_descriptors, split_descriptors, SeparatorPolicy, SheetRow};

use super::changeset::ChangeSet;
use super::commit::CommitStrategy;

/// Fatal batch failures on the write-back path. Any of these aborts the
/// remaining batch; rows already committed to durable caches stay committed.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("row {row}: {source}")]
    Link {
        row: usize,
        #[source]
        source: LinkError,
    },
    #[error("duplicate reference {reference} at rows {first_row} and {second_row}")]
    DuplicateReference {
        reference: CanonicalRef,
        first_row: usize,
        second_row: usize,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Counters for one batch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    /// Rows merged from canonical metadata.
    pub reconciled: usize,
    /// Rows without a reference whose descriptor cells were tidied.
    pub tidied: usize,
    /// Rows that produced an empty change-set.
    pub unchanged: usize,
    /// Rows whose change-set the operator declined.
    pub declined: usize,
}

pub struct ReconciliationEngine<'a> {
    cache: &'a MetadataCache,
    source: &'a dyn MetadataSource,
    commit: Box<dyn CommitStrategy>,
    separators: SeparatorPolicy,
    resolve_to_master: bool,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(
        cache: &'a MetadataCache,
        source: &'a dyn MetadataSource,
        commit: Box<dyn CommitStrategy>,
        separators: SeparatorPolicy,
        resolve_to_master: bool,
    ) -> Self {
        Self {
            cache,
            source,
            commit,
            separators,
            resolve_to_master,
        }
    }

    /// Processes a batch in place. Row indices in errors are zero-based
    /// positions within `rows` (the header is not part of the batch).
    ///
    /// A reference seen twice means a duplicated entry upstream, so the
    /// whole batch aborts rather than the row.
    pub fn process_batch(&self, rows: &mut [SheetRow]) -> Result<BatchStats, BatchError> {
        let mut stats = BatchStats::default();
        let mut seen: HashMap<CanonicalRef, usize> = HashMap::new();
        for index in 0..rows.len() {
            let had_reference = rows[index].has_reference();
            let (updated, changes) = if had_reference {
                let reference = normalize_link(
                    &rows[index].reference,
                    self.resolve_to_master,
                    self.cache,
                    self.source,
                )
                .map_err(|error| match error {
                    NormalizeError::Link(source) => BatchError::Link { row: index, source },
                    NormalizeError::Cache(error) => BatchError::Cache(error),
                })?;
                if let Some(first_row) = seen.insert(reference, index) {
                    return Err(BatchError::DuplicateReference {
                        reference,
                        first_row,
                        second_row: index,
                    });
                }
                let resolved = self.cache.fetch_resolved(&reference, self.source)?;
                self.merge(&rows[index], &reference, &resolved)
            } else {
                self.upkeep(&rows[index])
            };

            if changes.is_empty() {
                stats.unchanged += 1;
                continue;
            }
            let label = row_label(&updated, index);
            if self.commit.confirm(&label, &changes) {
                rows[index] = updated;
                if had_reference {
                    stats.reconciled += 1;
                } else {
                    stats.tidied += 1;
                }
            } else {
                info!("leaving {label} as it was");
                stats.declined += 1;
            }
        }
        Ok(stats)
    }

    /// Merges canonical metadata into a row.
    ///
    /// Title, artist display and main artist ids always come from the blob;
    /// year does unless the remote reports the 0 sentinel; artwork only when
    /// the blob carries images. Score, listened-on, reasons and credited ids
    /// are operator-owned and never touched.
    pub fn merge(
        &self,
        old: &SheetRow,
        reference: &CanonicalRef,
        resolved: &ResolvedMetadata,
    ) -> (SheetRow, ChangeSet) {
        let blob = &resolved.primary;
        let mut new = old.clone();
        new.reference = reference.url();
        new.title = blob.title.trim().to_string();

        let mut names: Vec<String> = Vec::new();
        for artist in &blob.artists {
            let name = clean_artist_name(&artist.name);
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        new.cover_artists = names.join(", ");
        new.main_artist_ids = blob
            .artists
            .iter()
            .filter(|artist| artist.id != 0)
            .map(|artist| artist.id.to_string())
            .collect::<Vec<_>>()
            .join("|");

        match resolved.year() {
            0 => warn!(
                "{:?}: remote reports an unknown year; keeping {:?}",
                new.title, old.year
            ),
            year => new.year = year.to_string(),
        }

        if let Some(uri) = resolved.first_image_uri() {
            new.artwork = uri.to_string();
        }

        new.genres = join_sorted_unique(&blob.genres);
        new.styles = join_sorted_unique(&blob.styles);

        let changes = diff(old, &new);
        (new, changes)
    }

    /// Light pass for rows without a reference: descriptor cells are
    /// re-split and re-joined in canonical form, nothing else.
    pub fn upkeep(&self, old: &SheetRow) -> (SheetRow, ChangeSet) {
        let mut new = old.clone();
        new.reasons = join_descriptors(&split_descriptors(&old.reasons, &self.separators));
        new.genres = join_descriptors(&split_descriptors(&old.genres, &self.separators));
        new.styles = join_descriptors(&split_descriptors(&old.styles, &self.separators));
        let changes = diff(old, &new);
        (new, changes)
    }
}

/// Every field except the operator-owned score and listened-on participates
/// in change detection.
fn diff(old: &SheetRow, new: &SheetRow) -> ChangeSet {
    let mut changes = ChangeSet::new();
    changes.record("title", &old.title, &new.title);
    changes.record("cover_artists", &old.cover_artists, &new.cover_artists);
    changes.record("year", &old.year, &new.year);
    changes.record("reasons", &old.reasons, &new.reasons);
    changes.record("artwork", &old.artwork, &new.artwork);
    changes.record("reference", &old.reference, &new.reference);
    changes.record("main_artist_ids", &old.main_artist_ids, &new.main_artist_ids);
    changes.record("genres", &old.genres, &new.genres);
    changes.record("styles", &old.styles, &new.styles);
    changes.record(
        "credited_artist_ids",
        &old.credited_artist_ids,
        &new.credited_artist_ids,
    );
    changes
}

/// Case-sensitive de-duplication, order-sorted, canonical join.
fn join_sorted_unique(values: &[String]) -> String {
    let mut values: Vec<String> = values
        .iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    values.sort();
    values.dedup();
    join_descriptors(&values)
}

fn row_label(row: &SheetRow, index: usize) -> String {
    format!("{} by {} (row {})", row.title, row.cover_artists, index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_sorted_unique() {
        let values = vec![
            "Jazz".to_string(),
            "Funk".to_string(),
            "Jazz".to_string(),
            "  ".to_string(),
        ];
        assert_eq!(join_sorted_unique(&values), "Funk; Jazz");
    }

    #[test]
    fn test_join_sorted_unique_is_case_sensitive() {
        let values = vec!["rock".to_string(), "Rock".to_string()];
        assert_eq!(join_sorted_unique(&values), "Rock; rock");
    }

    #[test]
    fn test_row_label_is_one_based() {
        let mut row = SheetRow::default();
        row.title = "Blue Train".to_string();
        row.cover_artists = "John Coltrane".to_string();
        assert_eq!(row_label(&row, 0), "Blue Train by John Coltrane (row 1)");
    }
}
