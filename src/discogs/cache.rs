//! Content-addressed cache over canonical metadata references.
//!
//! Entries are written synchronously as they are fetched, so a crash mid-run
//! loses at most the in-flight fetch. Cached entries expire after a
//! configurable number of weeks.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::client::{FetchError, MetadataSource};
use super::models::MetadataBlob;
use super::reference::{CanonicalRef, RefKind};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS metadata_cache (
    reference TEXT PRIMARY KEY,
    payload TEXT NOT NULL,
    fetched_at INTEGER NOT NULL
);";

/// Errors from fetch-through-cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("metadata cache store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// The blob for a normalized reference plus, for masters, the blob of the
/// main release in the group. Reconciliation reads both: the master carries
/// year, genres and styles, the release the more precise release data.
#[derive(Debug, Clone)]
pub struct ResolvedMetadata {
    pub primary: MetadataBlob,
    pub main_release: Option<MetadataBlob>,
}

impl ResolvedMetadata {
    /// Release year; the remote reports 0 when unknown.
    pub fn year(&self) -> i32 {
        self.primary.year
    }

    /// First artwork image, preferring the primary blob.
    pub fn first_image_uri(&self) -> Option<&str> {
        self.primary
            .images
            .first()
            .or_else(|| {
                self.main_release
                    .as_ref()
                    .and_then(|release| release.images.first())
            })
            .map(|image| image.uri.as_str())
    }
}

/// SQLite-backed cache of metadata blobs, keyed by canonical reference URL.
pub struct MetadataCache {
    conn: Connection,
    ttl_secs: i64,
}

impl MetadataCache {
    /// Opens (or creates) the cache database. An unreadable database is
    /// replaced by an empty one with a warning; the cache is disposable.
    pub fn open(path: &Path, ttl_weeks: u64) -> Result<Self> {
        let conn = match Self::try_open(path) {
            Ok(conn) => conn,
            Err(error) => {
                warn!("metadata cache at {:?} is unreadable ({error}); starting over empty", path);
                std::fs::remove_file(path)
                    .with_context(|| format!("removing corrupt metadata cache {:?}", path))?;
                Self::try_open(path).context("recreating metadata cache")?
            }
        };
        Ok(Self {
            conn,
            ttl_secs: ttl_weeks as i64 * 7 * 24 * 60 * 60,
        })
    }

    fn try_open(path: &Path) -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        // A corrupt file fails here with NotADatabase.
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    /// Returns the cached blob when present and within TTL. An unparseable
    /// payload counts as a miss so the entry gets refetched.
    pub fn lookup(&self, reference: &CanonicalRef) -> Result<Option<MetadataBlob>, CacheError> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT payload, fetched_at FROM metadata_cache WHERE reference = ?1",
                params![reference.url()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((payload, fetched_at)) = row else {
            return Ok(None);
        };
        if fetched_at + self.ttl_secs <= Utc::now().timestamp() {
            debug!("cache entry for {reference} has expired");
            return Ok(None);
        }
        match serde_json::from_str(&payload) {
            Ok(blob) => Ok(Some(blob)),
            Err(error) => {
                warn!("cached payload for {reference} is unreadable ({error}); refetching");
                Ok(None)
            }
        }
    }

    /// Upserts one entry. Synchronous per entry, never batched.
    pub fn store(&self, reference: &CanonicalRef, blob: &MetadataBlob) -> Result<(), CacheError> {
        let payload = serde_json::to_string(blob).expect("metadata blob serializes");
        self.conn.execute(
            "INSERT INTO metadata_cache (reference, payload, fetched_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(reference) DO UPDATE SET
                 payload = excluded.payload, fetched_at = excluded.fetched_at",
            params![reference.url(), payload, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Fetch-through: a cache hit within TTL performs zero network calls.
    ///
    /// Resolving a master also ensures its main release is cached, under the
    /// same cache and retry rules.
    pub fn fetch(
        &self,
        reference: &CanonicalRef,
        source: &dyn MetadataSource,
    ) -> Result<MetadataBlob, CacheError> {
        let blob = match self.lookup(reference)? {
            Some(blob) => {
                debug!("cache hit for {reference}");
                blob
            }
            None => {
                let blob = match reference.kind {
                    RefKind::Master => source.master(reference.id)?,
                    RefKind::Release => source.release(reference.id)?,
                };
                self.store(reference, &blob)?;
                blob
            }
        };
        if reference.kind == RefKind::Master {
            match blob.main_release {
                Some(release_id) => {
                    let release_ref = CanonicalRef::release(release_id);
                    if self.lookup(&release_ref)?.is_none() {
                        info!("fetching main release {release_id} for {reference}");
                        let release = source.release(release_id)?;
                        self.store(&release_ref, &release)?;
                    }
                }
                None => warn!("master {} reports no main release", reference.id),
            }
        }
        Ok(blob)
    }

    /// Fetches the reference and, for masters, returns the main release
    /// alongside.
    pub fn fetch_resolved(
        &self,
        reference: &CanonicalRef,
        source: &dyn MetadataSource,
    ) -> Result<ResolvedMetadata, CacheError> {
        let primary = self.fetch(reference, source)?;
        let main_release = match (reference.kind, primary.main_release) {
            (RefKind::Master, Some(release_id)) => {
                self.lookup(&CanonicalRef::release(release_id))?
            }
            _ => None,
        };
        Ok(ResolvedMetadata {
            primary,
            main_release,
        })
    }

    /// Number of entries currently stored, expired or not.
    pub fn len(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM metadata_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
