//! Canonical references into the discography catalog.
//!
//! A raw user-entered link is reduced to a `{kind, id}` pair; that canonical
//! form is the key for every cache lookup downstream.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::cache::{CacheError, MetadataCache};
use super::client::MetadataSource;

/// Raised when a raw link does not contain a recognizable resource path.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unrecognized discography link: {0}")]
    Unrecognized(String),
}

/// The two granularities the remote catalog exposes. A master groups the
/// physical releases of one work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Master,
    Release,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefKind::Master => "master",
            RefKind::Release => "release",
        }
    }
}

/// Normalized `{kind, id}` form of a raw link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalRef {
    pub kind: RefKind,
    pub id: u64,
}

impl CanonicalRef {
    pub fn master(id: u64) -> Self {
        Self {
            kind: RefKind::Master,
            id,
        }
    }

    pub fn release(id: u64) -> Self {
        Self {
            kind: RefKind::Release,
            id,
        }
    }

    /// Parses a raw link. Exactly `master/<id>` and `release/<id>` path
    /// segments are recognized (an optional `view/` infix survives from older
    /// link formats); any other shape is an error.
    ///
    /// Parsing the canonical form returns an equal value, so normalization is
    /// idempotent.
    pub fn parse(raw: &str) -> Result<Self, LinkError> {
        static MASTER_RE: OnceLock<Regex> = OnceLock::new();
        static RELEASE_RE: OnceLock<Regex> = OnceLock::new();
        let master_re =
            MASTER_RE.get_or_init(|| Regex::new(r"/master/(?:view/)?(\d+)").unwrap());
        let release_re =
            RELEASE_RE.get_or_init(|| Regex::new(r"/release/(?:view/)?(\d+)").unwrap());

        // Query strings and fragments never carry the resource path.
        let path = raw.split(['?', '#']).next().unwrap_or(raw);
        if let Some(captures) = master_re.captures(path) {
            let id = captures[1]
                .parse()
                .map_err(|_| LinkError::Unrecognized(raw.to_string()))?;
            return Ok(CanonicalRef::master(id));
        }
        if let Some(captures) = release_re.captures(path) {
            let id = captures[1]
                .parse()
                .map_err(|_| LinkError::Unrecognized(raw.to_string()))?;
            return Ok(CanonicalRef::release(id));
        }
        Err(LinkError::Unrecognized(raw.to_string()))
    }

    /// Canonical URL form, also the persisted cache key.
    pub fn url(&self) -> String {
        format!("https://www.discogs.com/{}/{}", self.kind.as_str(), self.id)
    }
}

impl fmt::Display for CanonicalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.id)
    }
}

impl Serialize for CanonicalRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.url())
    }
}

/// Errors raised while normalizing a raw link.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Reduces a raw link to canonical form.
///
/// When `resolve_to_master` is set, release links are promoted to their
/// master when the release carries one; a release without a master keeps its
/// release reference. The extra lookup goes through the metadata cache, so
/// repeats cost no network call.
pub fn normalize_link(
    raw: &str,
    resolve_to_master: bool,
    cache: &MetadataCache,
    source: &dyn MetadataSource,
) -> Result<CanonicalRef, NormalizeError> {
    let parsed = CanonicalRef::parse(raw)?;
    if parsed.kind == RefKind::Release && resolve_to_master {
        let blob = cache.fetch(&parsed, source)?;
        if let Some(master_id) = blob.master_id {
            debug!("resolved release {} to master {master_id}", parsed.id);
            return Ok(CanonicalRef::master(master_id));
        }
    }
    Ok(parsed)
}
