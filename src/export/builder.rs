//! Relational export: INSERT statement generation.
//!
//! Emission order is fixed (artists, albums, artist-album links, descriptor
//! tables, descriptor-album links): the downstream load scripts populate
//! tables in file order, and later rows reference earlier tables by id.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use thiserror::Error;
use tracing::info;

use crate::discogs::{FetchError, MetadataSource};
use crate::sheet::AlbumRecord;

use super::artist_names::ArtistNameCache;
use super::surrogate::SurrogateRegistry;

/// Which album columns the export carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportVariant {
    /// Full export including Score and ListenedOn.
    Scored,
    /// Public export: no score columns, personal-only rows dropped.
    Public,
}

/// Reasons that mark a row as personal bookkeeping. A row whose reasons are
/// exclusively these is excluded from the public variant.
const PERSONAL_REASONS: &[&str] = &["manual", "relation", "recommendation"];

/// Fatal export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not resolve artist {artist_id}; remove the id from the source row to proceed")]
    ArtistResolution {
        artist_id: i64,
        #[source]
        source: FetchError,
    },
}

/// One album with its registry-assigned descriptor ids.
#[derive(Debug)]
struct PreparedAlbum<'a> {
    record: &'a AlbumRecord,
    reason_ids: Vec<i64>,
    genre_ids: Vec<i64>,
    style_ids: Vec<i64>,
}

/// A variant's album selection with descriptor ids assigned.
pub struct ExportBatch<'a> {
    variant: ExportVariant,
    albums: Vec<PreparedAlbum<'a>>,
}

impl ExportBatch<'_> {
    pub fn album_count(&self) -> usize {
        self.albums.len()
    }
}

/// Filters records for the variant, assigns descriptor surrogate ids in row
/// order, and resolves every referenced artist through the name cache
/// (downloading missing ones).
pub fn prepare_batch<'a>(
    records: &'a [AlbumRecord],
    variant: ExportVariant,
    reasons: &mut SurrogateRegistry,
    genres: &mut SurrogateRegistry,
    styles: &mut SurrogateRegistry,
    artist_names: &mut ArtistNameCache,
    source: &dyn MetadataSource,
) -> Result<ExportBatch<'a>, ExportError> {
    let mut albums = Vec::new();
    for record in records {
        if variant == ExportVariant::Public && is_personal_only(record) {
            continue;
        }
        let reason_ids = record.reasons.iter().map(|d| reasons.add(d)).collect();
        let genre_ids = record.genres.iter().map(|d| genres.add(d)).collect();
        let style_ids = record.styles.iter().map(|d| styles.add(d)).collect();
        for artist_id in record
            .main_artist_ids
            .iter()
            .chain(&record.credited_artist_ids)
        {
            artist_names
                .resolve(*artist_id, source)
                .map_err(|source| ExportError::ArtistResolution {
                    artist_id: *artist_id,
                    source,
                })?;
        }
        albums.push(PreparedAlbum {
            record,
            reason_ids,
            genre_ids,
            style_ids,
        });
    }
    Ok(ExportBatch { variant, albums })
}

fn is_personal_only(record: &AlbumRecord) -> bool {
    !record.reasons.is_empty()
        && record
            .reasons
            .iter()
            .all(|reason| PERSONAL_REASONS.contains(&reason.trim().to_lowercase().as_str()))
}

/// Escapes a string for a single-quoted SQL literal.
pub fn escape_apostrophes(value: &str) -> String {
    value.replace('\'', "\\'")
}

/// Wraps a value in single quotes.
pub fn quote(value: &str) -> String {
    format!("'{value}'")
}

fn quoted(value: &str) -> String {
    quote(&escape_apostrophes(value))
}

fn quoted_or_null(value: Option<&str>) -> String {
    match value {
        Some(value) => quoted(value),
        None => "NULL".to_string(),
    }
}

/// Generates the INSERT statements for a prepared batch in the fixed table
/// order. Every artist referenced by the batch must already be present in
/// the name cache.
pub fn build_statements(
    batch: &ExportBatch<'_>,
    artist_names: &ArtistNameCache,
    reasons: &SurrogateRegistry,
    genres: &SurrogateRegistry,
    styles: &SurrogateRegistry,
) -> Result<Vec<String>> {
    let mut statements = Vec::new();

    // Artist table: every cached artist, ordered by external id; the
    // position establishes the surrogate ArtistID.
    let mut artist_surrogates: HashMap<i64, usize> = HashMap::new();
    for (position, (external_id, name)) in artist_names.entries().enumerate() {
        let artist_id = position + 1;
        artist_surrogates.insert(external_id, artist_id);
        statements.push(format!(
            "INSERT INTO Artist (ArtistID, ExternalURL, Name) VALUES ({artist_id}, {url}, {name});",
            url = quoted(&format!("https://www.discogs.com/artist/{external_id}")),
            name = quoted(name),
        ));
    }

    // Album rows in batch order, 1-based.
    for (index, album) in batch.albums.iter().enumerate() {
        let album_id = index + 1;
        let record = album.record;
        let reference_url = record.reference.map(|reference| reference.url());
        let artwork = quoted_or_null(record.artwork.as_deref());
        let reference = quoted_or_null(reference_url.as_deref());
        let statement = match batch.variant {
            ExportVariant::Scored => {
                let score = match record.score {
                    Some(score) => score.to_string(),
                    None => "NULL".to_string(),
                };
                let listened = record
                    .listened_on
                    .map(|date| date.format("%Y-%m-%d").to_string());
                format!(
                    "INSERT INTO Album (AlbumID, Name, Year, CoverArtists, ArtworkURL, ExternalURL, Score, ListenedOn) \
                     VALUES ({album_id}, {name}, {year}, {cover}, {artwork}, {reference}, {score}, {listened_on});",
                    name = quoted(&record.title),
                    year = record.year,
                    cover = quoted(&record.cover_artists),
                    listened_on = quoted_or_null(listened.as_deref()),
                )
            }
            ExportVariant::Public => format!(
                "INSERT INTO Album (AlbumID, Name, Year, CoverArtists, ArtworkURL, ExternalURL) \
                 VALUES ({album_id}, {name}, {year}, {cover}, {artwork}, {reference});",
                name = quoted(&record.title),
                year = record.year,
                cover = quoted(&record.cover_artists),
            ),
        };
        statements.push(statement);
    }

    // Artist-album links: Type 1 for primary artists, 0 for credited.
    for (index, album) in batch.albums.iter().enumerate() {
        let album_id = index + 1;
        for (artist_ids, link_type) in [
            (&album.record.main_artist_ids, 1),
            (&album.record.credited_artist_ids, 0),
        ] {
            for external_id in artist_ids {
                let Some(artist_id) = artist_surrogates.get(external_id) else {
                    bail!("artist {external_id} referenced by the batch is missing from the name cache");
                };
                statements.push(format!(
                    "INSERT INTO ArtistWorkedOnAlbum (AlbumID, ArtistID, Type) \
                     VALUES ({album_id}, {artist_id}, {link_type});"
                ));
            }
        }
    }

    // Descriptor tables in first-seen order.
    for (table, registry) in [("Reason", reasons), ("Genre", genres), ("Style", styles)] {
        for (description, id) in registry.entries() {
            statements.push(format!(
                "INSERT INTO {table} ({table}ID, Description) VALUES ({id}, {description});",
                description = quoted(description),
            ));
        }
    }

    // Descriptor-album junctions.
    for (index, album) in batch.albums.iter().enumerate() {
        let album_id = index + 1;
        for (table, ids) in [
            ("Reason", &album.reason_ids),
            ("Genre", &album.genre_ids),
            ("Style", &album.style_ids),
        ] {
            for id in ids {
                statements.push(format!(
                    "INSERT INTO Album{table} (AlbumID, {table}ID) VALUES ({album_id}, {id});"
                ));
            }
        }
    }

    Ok(statements)
}

/// Concatenates the externally supplied schema template with the generated
/// statements, one per line.
pub fn write_statement_file(
    template_path: &Path,
    output_path: &Path,
    statements: &[String],
) -> Result<()> {
    let template = fs::read_to_string(template_path)
        .with_context(|| format!("reading schema template {:?}", template_path))?;
    let mut out = String::with_capacity(template.len() + statements.len() * 64);
    out.push_str(&template);
    if !template.ends_with('\n') {
        out.push('\n');
    }
    for statement in statements {
        out.push_str(statement);
        out.push('\n');
    }
    fs::write(output_path, out)
        .with_context(|| format!("writing statements to {:?}", output_path))?;
    info!("wrote {} statement(s) to {:?}", statements.len(), output_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_apostrophes() {
        assert_eq!(escape_apostrophes("Don't"), "Don\\'t");
        assert_eq!(escape_apostrophes("plain"), "plain");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("value"), "'value'");
        assert_eq!(quoted("Don't"), "'Don\\'t'");
    }

    #[test]
    fn test_quoted_or_null() {
        assert_eq!(quoted_or_null(Some("x")), "'x'");
        assert_eq!(quoted_or_null(None), "NULL");
    }

    fn record_with_reasons(reasons: &[&str]) -> AlbumRecord {
        AlbumRecord {
            score: None,
            note: None,
            title: "T".to_string(),
            cover_artists: "A".to_string(),
            year: 2000,
            listened_on: None,
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
            artwork: None,
            reference: None,
            main_artist_ids: vec![],
            credited_artist_ids: vec![],
            genres: vec![],
            styles: vec![],
        }
    }

    #[test]
    fn test_personal_only_detection() {
        assert!(is_personal_only(&record_with_reasons(&["Manual"])));
        assert!(is_personal_only(&record_with_reasons(&[
            "manual",
            "Recommendation"
        ])));
        assert!(!is_personal_only(&record_with_reasons(&[
            "Manual",
            "1001 Albums"
        ])));
        assert!(!is_personal_only(&record_with_reasons(&[])));
    }
}
