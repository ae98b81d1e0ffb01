//! Row records for the album worksheet.
//!
//! Two shapes: [`SheetRow`] mirrors the worksheet cells verbatim and is what
//! reconciliation rewrites; [`AlbumRecord`] is the validated form the export
//! pipeline consumes.

use std::sync::OnceLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::discogs::{CanonicalRef, LinkError};

/// Fixed number of worksheet columns.
pub const COLUMN_COUNT: usize = 12;

/// Which separators split multi-valued descriptor cells. The worksheet's
/// history is inconsistent about this, so it is configuration rather than a
/// constant.
#[derive(Debug, Clone)]
pub struct SeparatorPolicy {
    pub separators: Vec<char>,
}

impl SeparatorPolicy {
    pub fn new(separators: &str) -> Self {
        Self {
            separators: separators.chars().filter(|c| !c.is_whitespace()).collect(),
        }
    }
}

impl Default for SeparatorPolicy {
    fn default() -> Self {
        Self {
            separators: vec![',', ';', '|'],
        }
    }
}

/// Descriptor values that legitimately contain a separator and must survive
/// splitting as one token.
pub const COMPOUND_DESCRIPTORS: &[&str] = &["Folk, World, & Country"];

/// Splits a multi-valued cell into descriptors. Compound values are pulled
/// out whole before the generic split.
pub fn split_descriptors(cell: &str, policy: &SeparatorPolicy) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = cell.to_string();
    for compound in COMPOUND_DESCRIPTORS {
        if rest.contains(compound) {
            rest = rest.replace(compound, "");
            parts.push((*compound).to_string());
        }
    }
    for piece in rest.split(|c: char| policy.separators.contains(&c)) {
        let piece = piece.trim();
        if !piece.is_empty() {
            parts.push(piece.to_string());
        }
    }
    parts
}

/// Joins descriptors back into a cell, the canonical writing form.
pub fn join_descriptors<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|part| part.as_ref())
        .collect::<Vec<_>>()
        .join("; ")
}

/// One worksheet row, cells verbatim, in fixed column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    pub score: String,
    pub title: String,
    pub cover_artists: String,
    pub year: String,
    pub listened_on: String,
    pub reasons: String,
    pub artwork: String,
    pub reference: String,
    pub main_artist_ids: String,
    pub genres: String,
    pub styles: String,
    pub credited_artist_ids: String,
    /// How many of the expected columns the source row actually carried.
    /// Short rows are right-padded, but the original width stays inspectable.
    pub present_columns: usize,
}

impl SheetRow {
    /// Builds a row from raw cells, right-padding short rows with empty
    /// strings.
    pub fn from_cells(cells: &[String]) -> Self {
        if cells.len() > COLUMN_COUNT {
            warn!(
                "row has {} cells, expected at most {COLUMN_COUNT}; extras ignored",
                cells.len()
            );
        }
        let cell = |index: usize| cells.get(index).cloned().unwrap_or_default();
        Self {
            score: cell(0),
            title: cell(1),
            cover_artists: cell(2),
            year: cell(3),
            listened_on: cell(4),
            reasons: cell(5),
            artwork: cell(6),
            reference: cell(7),
            main_artist_ids: cell(8),
            genres: cell(9),
            styles: cell(10),
            credited_artist_ids: cell(11),
            present_columns: cells.len().min(COLUMN_COUNT),
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.score.clone(),
            self.title.clone(),
            self.cover_artists.clone(),
            self.year.clone(),
            self.listened_on.clone(),
            self.reasons.clone(),
            self.artwork.clone(),
            self.reference.clone(),
            self.main_artist_ids.clone(),
            self.genres.clone(),
            self.styles.clone(),
            self.credited_artist_ids.clone(),
        ]
    }

    pub fn has_reference(&self) -> bool {
        !self.reference.trim().is_empty()
    }
}

/// Row-level parse failures, yielded inline so export callers can choose to
/// report and continue.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("unparseable year {value:?}")]
    Year { value: String },
    #[error("unparseable listened-on date {value:?}")]
    ListenedOn { value: String },
    #[error("unparseable artist id {value:?}")]
    ArtistId { value: String },
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Score annotations marking an album as dropped rather than scored.
const DROPPED_NOTES: &[&str] = &["cant find", "nope"];

/// Fully validated album row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumRecord {
    pub score: Option<f64>,
    /// Non-numeric score annotation for albums that could not be listened
    /// to (for example "cant find").
    pub note: Option<String>,
    pub title: String,
    pub cover_artists: String,
    pub year: i32,
    pub listened_on: Option<NaiveDate>,
    pub reasons: Vec<String>,
    pub artwork: Option<String>,
    pub reference: Option<CanonicalRef>,
    pub main_artist_ids: Vec<i64>,
    pub credited_artist_ids: Vec<i64>,
    pub genres: Vec<String>,
    pub styles: Vec<String>,
}

impl AlbumRecord {
    /// Validates one raw row.
    ///
    /// The score/listened-on pairing is logged when violated, never
    /// rejected: the worksheet legitimately passes through that state while
    /// an entry is being filled in.
    pub fn parse(row: &SheetRow, policy: &SeparatorPolicy) -> Result<Self, RowError> {
        let score_cell = row.score.trim();
        let mut note = None;
        let score = match score_cell.parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                if DROPPED_NOTES.contains(&score_cell) {
                    note = Some(score_cell.to_string());
                } else if !score_cell.is_empty() {
                    warn!("unexpected score value {score_cell:?} for {:?}", row.title);
                }
                None
            }
        };

        let year = row
            .year
            .trim()
            .parse::<i32>()
            .map_err(|_| RowError::Year {
                value: row.year.clone(),
            })?;

        let listened_on = parse_listened_on(&row.listened_on)?;
        if listened_on.is_some() != score.is_some() && note.is_none() {
            warn!(
                "{:?} ({:?}) has a score and listened-on date that do not pair up",
                row.title, row.cover_artists
            );
        }

        let artwork = extract_artwork_url(&row.artwork);
        if artwork.is_none() && !row.artwork.trim().is_empty() {
            warn!(
                "no artwork URL found in {:?} for {:?}",
                row.artwork, row.title
            );
        }

        let reference = match row.reference.trim() {
            "" => None,
            raw => Some(CanonicalRef::parse(raw)?),
        };

        Ok(Self {
            score,
            note,
            title: row.title.trim().to_string(),
            cover_artists: row.cover_artists.trim().to_string(),
            year,
            listened_on,
            reasons: split_descriptors(&row.reasons, policy),
            artwork,
            reference,
            main_artist_ids: split_ids(&row.main_artist_ids, policy)?,
            credited_artist_ids: split_ids(&row.credited_artist_ids, policy)?,
            genres: split_descriptors(&row.genres, policy),
            styles: split_descriptors(&row.styles, policy),
        })
    }
}

fn split_ids(cell: &str, policy: &SeparatorPolicy) -> Result<Vec<i64>, RowError> {
    split_descriptors(cell, policy)
        .iter()
        .map(|piece| {
            piece.parse().map_err(|_| RowError::ArtistId {
                value: piece.clone(),
            })
        })
        .collect()
}

/// Spreadsheet day zero for date serials.
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch")
}

/// Parses a listened-on cell: either a spreadsheet date serial (days since
/// 1899-12-30) or an ISO `YYYY-MM-DD` date.
fn parse_listened_on(cell: &str) -> Result<Option<NaiveDate>, RowError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    if let Ok(serial) = cell.parse::<u64>() {
        return serial_epoch()
            .checked_add_days(Days::new(serial))
            .map(Some)
            .ok_or(RowError::ListenedOn {
                value: cell.to_string(),
            });
    }
    NaiveDate::parse_from_str(cell, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| RowError::ListenedOn {
            value: cell.to_string(),
        })
}

/// Pulls the bare URL out of an artwork cell, which is either a plain URL or
/// an `=IMAGE("...")` formula.
fn extract_artwork_url(cell: &str) -> Option<String> {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    let url_re = URL_RE.get_or_init(|| Regex::new(r#"https?://[^"')\s]+"#).unwrap());
    url_re.find(cell).map(|found| found.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn full_row() -> SheetRow {
        SheetRow::from_cells(&cells(&[
            "7.5",
            "Blue Train",
            "John Coltrane",
            "1957",
            "43100",
            "1001 Albums; Vinyl",
            "=IMAGE(\"https://img.example.com/bt.jpg\")",
            "https://www.discogs.com/master/100",
            "123|456",
            "Jazz",
            "Hard Bop; Modal",
            "789",
        ]))
    }

    #[test]
    fn test_short_rows_are_right_padded() {
        let row = SheetRow::from_cells(&cells(&["", "Title"]));
        assert_eq!(row.title, "Title");
        assert_eq!(row.styles, "");
        assert_eq!(row.present_columns, 2);
        assert_eq!(row.to_cells().len(), COLUMN_COUNT);
    }

    #[test]
    fn test_cells_round_trip() {
        let row = full_row();
        assert_eq!(row.present_columns, COLUMN_COUNT);
        assert_eq!(SheetRow::from_cells(&row.to_cells()), row);
    }

    #[test]
    fn test_split_descriptors_generic() {
        let policy = SeparatorPolicy::default();
        assert_eq!(
            split_descriptors("Rock, Pop; Funk | Soul", &policy),
            vec!["Rock", "Pop", "Funk", "Soul"]
        );
        assert_eq!(split_descriptors("  ", &policy), Vec::<String>::new());
        assert_eq!(split_descriptors("Rock", &policy), vec!["Rock"]);
    }

    #[test]
    fn test_split_descriptors_compound_literal() {
        let policy = SeparatorPolicy::default();
        assert_eq!(
            split_descriptors("Folk, World, & Country, Pop", &policy),
            vec!["Folk, World, & Country", "Pop"]
        );
        assert_eq!(
            split_descriptors("Folk, World, & Country", &policy),
            vec!["Folk, World, & Country"]
        );
    }

    #[test]
    fn test_split_descriptors_respects_configured_separators() {
        let policy = SeparatorPolicy::new(";");
        assert_eq!(
            split_descriptors("Rock, Pop; Funk", &policy),
            vec!["Rock, Pop", "Funk"]
        );
    }

    #[test]
    fn test_join_descriptors() {
        assert_eq!(join_descriptors(&["Rock", "Pop"]), "Rock; Pop");
        assert_eq!(join_descriptors::<&str>(&[]), "");
    }

    #[test]
    fn test_parse_full_row() {
        let record = AlbumRecord::parse(&full_row(), &SeparatorPolicy::default()).unwrap();
        assert_eq!(record.score, Some(7.5));
        assert_eq!(record.title, "Blue Train");
        assert_eq!(record.year, 1957);
        assert_eq!(
            record.listened_on,
            Some(NaiveDate::from_ymd_opt(2017, 12, 31).unwrap())
        );
        assert_eq!(record.reasons, vec!["1001 Albums", "Vinyl"]);
        assert_eq!(
            record.artwork.as_deref(),
            Some("https://img.example.com/bt.jpg")
        );
        assert_eq!(record.reference, Some(CanonicalRef::master(100)));
        assert_eq!(record.main_artist_ids, vec![123, 456]);
        assert_eq!(record.credited_artist_ids, vec![789]);
        assert_eq!(record.note, None);
    }

    #[test]
    fn test_parse_unscored_row() {
        let mut row = full_row();
        row.score = String::new();
        row.listened_on = String::new();
        let record = AlbumRecord::parse(&row, &SeparatorPolicy::default()).unwrap();
        assert_eq!(record.score, None);
        assert_eq!(record.listened_on, None);
    }

    #[test]
    fn test_parse_dropped_note() {
        let mut row = full_row();
        row.score = "cant find".to_string();
        row.listened_on = String::new();
        let record = AlbumRecord::parse(&row, &SeparatorPolicy::default()).unwrap();
        assert_eq!(record.score, None);
        assert_eq!(record.note.as_deref(), Some("cant find"));
    }

    #[test]
    fn test_parse_rejects_bad_year() {
        let mut row = full_row();
        row.year = "soon".to_string();
        assert!(matches!(
            AlbumRecord::parse(&row, &SeparatorPolicy::default()),
            Err(RowError::Year { .. })
        ));
    }

    #[test]
    fn test_parse_accepts_iso_listened_on() {
        let mut row = full_row();
        row.listened_on = "2020-05-01".to_string();
        let record = AlbumRecord::parse(&row, &SeparatorPolicy::default()).unwrap();
        assert_eq!(
            record.listened_on,
            Some(NaiveDate::from_ymd_opt(2020, 5, 1).unwrap())
        );
    }

    #[test]
    fn test_parse_date_serial_epoch() {
        assert_eq!(
            parse_listened_on("1").unwrap(),
            Some(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap())
        );
    }

    #[test]
    fn test_parse_missing_artwork_is_none() {
        let mut row = full_row();
        row.artwork = String::new();
        let record = AlbumRecord::parse(&row, &SeparatorPolicy::default()).unwrap();
        assert_eq!(record.artwork, None);
    }

    #[test]
    fn test_parse_plain_artwork_url() {
        let mut row = full_row();
        row.artwork = "https://img.example.com/plain.png".to_string();
        let record = AlbumRecord::parse(&row, &SeparatorPolicy::default()).unwrap();
        assert_eq!(
            record.artwork.as_deref(),
            Some("https://img.example.com/plain.png")
        );
    }

    #[test]
    fn test_parse_rejects_malformed_reference() {
        let mut row = full_row();
        row.reference = "https://www.discogs.com/artist/42".to_string();
        assert!(matches!(
            AlbumRecord::parse(&row, &SeparatorPolicy::default()),
            Err(RowError::Link(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_artist_id() {
        let mut row = full_row();
        row.main_artist_ids = "12|notanid".to_string();
        assert!(matches!(
            AlbumRecord::parse(&row, &SeparatorPolicy::default()),
            Err(RowError::ArtistId { .. })
        ));
    }
}
