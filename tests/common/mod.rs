//! Common test infrastructure
//!
//! A scripted in-memory metadata source plus worksheet row builders. Tests
//! should only import from this module.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use albumshelf::discogs::{ArtistCredit, Credit, FetchError, Image, MetadataBlob, MetadataSource};
use albumshelf::sheet::SheetRow;

/// Per-kind network call counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub masters: usize,
    pub releases: usize,
    pub artists: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.masters + self.releases + self.artists
    }
}

/// Scripted metadata source that serves canned blobs and counts calls.
#[derive(Default)]
pub struct StubMetadataSource {
    masters: HashMap<u64, MetadataBlob>,
    releases: HashMap<u64, MetadataBlob>,
    artist_names: HashMap<i64, String>,
    calls: Mutex<CallCounts>,
}

impl StubMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_master(mut self, id: u64, blob: MetadataBlob) -> Self {
        self.masters.insert(id, blob);
        self
    }

    pub fn with_release(mut self, id: u64, blob: MetadataBlob) -> Self {
        self.releases.insert(id, blob);
        self
    }

    pub fn with_artist(mut self, id: i64, name: &str) -> Self {
        self.artist_names.insert(id, name.to_string());
        self
    }

    pub fn call_counts(&self) -> CallCounts {
        *self.calls.lock().unwrap()
    }
}

impl MetadataSource for StubMetadataSource {
    fn master(&self, id: u64) -> Result<MetadataBlob, FetchError> {
        self.calls.lock().unwrap().masters += 1;
        self.masters
            .get(&id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("master {id}")))
    }

    fn release(&self, id: u64) -> Result<MetadataBlob, FetchError> {
        self.calls.lock().unwrap().releases += 1;
        self.releases
            .get(&id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("release {id}")))
    }

    fn artist_name(&self, id: i64) -> Result<String, FetchError> {
        self.calls.lock().unwrap().artists += 1;
        self.artist_names
            .get(&id)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(format!("artist {id}")))
    }
}

/// A source for paths that must never touch the network.
pub struct PanicSource;

impl MetadataSource for PanicSource {
    fn master(&self, id: u64) -> Result<MetadataBlob, FetchError> {
        panic!("unexpected master fetch for {id}");
    }

    fn release(&self, id: u64) -> Result<MetadataBlob, FetchError> {
        panic!("unexpected release fetch for {id}");
    }

    fn artist_name(&self, id: i64) -> Result<String, FetchError> {
        panic!("unexpected artist fetch for {id}");
    }
}

/// An empty blob with just a title and year.
pub fn bare_blob(title: &str, year: i32) -> MetadataBlob {
    MetadataBlob {
        title: title.to_string(),
        artists: vec![],
        year,
        images: vec![],
        genres: vec![],
        styles: vec![],
        credits: vec![],
        main_release: None,
        master_id: None,
    }
}

/// A fully populated master blob.
pub fn master_blob(
    title: &str,
    year: i32,
    artists: &[(i64, &str)],
    genres: &[&str],
    styles: &[&str],
    image_uri: &str,
    main_release: Option<u64>,
) -> MetadataBlob {
    MetadataBlob {
        title: title.to_string(),
        artists: artists
            .iter()
            .map(|(id, name)| ArtistCredit {
                id: *id,
                name: name.to_string(),
            })
            .collect(),
        year,
        images: vec![Image {
            uri: image_uri.to_string(),
        }],
        genres: genres.iter().map(|g| g.to_string()).collect(),
        styles: styles.iter().map(|s| s.to_string()).collect(),
        credits: vec![],
        main_release,
        master_id: None,
    }
}

/// A release blob pointing back at an optional master.
pub fn release_blob(title: &str, year: i32, master_id: Option<u64>) -> MetadataBlob {
    let mut blob = bare_blob(title, year);
    blob.master_id = master_id;
    blob
}

/// Adds credited (non-primary) artists to a blob.
pub fn with_credits(mut blob: MetadataBlob, credit_ids: &[i64]) -> MetadataBlob {
    blob.credits = credit_ids.iter().map(|id| Credit { id: *id }).collect();
    blob
}

/// Builds a [`SheetRow`] from raw cell values.
pub fn sheet_row(cells: &[&str]) -> SheetRow {
    let cells: Vec<String> = cells.iter().map(|cell| cell.to_string()).collect();
    SheetRow::from_cells(&cells)
}

/// An otherwise-empty row carrying only an external reference.
pub fn row_with_reference(reference: &str) -> SheetRow {
    sheet_row(&["", "", "", "", "", "", "", reference, "", "", "", ""])
}

pub const HEADER: &[&str] = &[
    "Score",
    "Album",
    "Artists on Album Cover",
    "Year",
    "Listened On",
    "Reason",
    "Album Artwork",
    "Discogs Link",
    "Main Artist ID(s)",
    "Genre",
    "Style",
    "Credit ID(s)",
];
