//! Wire models for the discography metadata service.
//!
//! A [`MetadataBlob`] is produced once by the remote service and persisted
//! verbatim in the cache; it is never mutated locally.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One artist entry on a master or release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistCredit {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// An image attached to a master or release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub uri: String,
}

/// A credited (non-primary) artist reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub id: i64,
}

/// Canonical metadata for one master or release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataBlob {
    pub title: String,
    #[serde(default)]
    pub artists: Vec<ArtistCredit>,
    /// Release year; the remote reports 0 when unknown.
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    /// Non-primary credits. The service historically called these
    /// "extraartists".
    #[serde(default, alias = "extraartists")]
    pub credits: Vec<Credit>,
    /// Masters only: the id of the main release in the group.
    #[serde(default)]
    pub main_release: Option<u64>,
    /// Releases only: the master this release belongs to, if any.
    #[serde(default)]
    pub master_id: Option<u64>,
}

/// Strips the numeric disambiguation suffix the service appends to duplicate
/// artist names (`"Sugar (3)"` becomes `"Sugar"`).
pub fn clean_artist_name(name: &str) -> String {
    static SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
    let suffix_re = SUFFIX_RE.get_or_init(|| Regex::new(r"\s*\(\d+\)$").unwrap());
    suffix_re.replace(name.trim(), "").trim().to_string()
}
