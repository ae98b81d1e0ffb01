//! Persisted artist id to display name cache.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::discogs::{clean_artist_name, FetchError, MetadataSource};

/// Placeholder id the remote uses for various-artists compilations. It has
/// no artist page, so it must never go over the network.
pub const VARIOUS_ARTISTS_ID: i64 = 194;
const VARIOUS_ARTISTS_NAME: &str = "Various";

/// How many cache misses may accumulate before the store is flushed.
const FLUSH_EVERY: u32 = 25;

/// Durable id to name map for artist references.
///
/// Backed by a JSON file that is flushed every [`FLUSH_EVERY`] downloads and
/// once at the end of a run, bounding data loss on a crash without paying a
/// write per lookup.
pub struct ArtistNameCache {
    path: PathBuf,
    names: BTreeMap<i64, String>,
    misses_since_flush: u32,
}

impl ArtistNameCache {
    /// Loads the cache. A missing or unreadable file degrades to an empty
    /// cache (with a warning for the unreadable case).
    pub fn load(path: &Path) -> Self {
        let names = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<i64, String>>(&text) {
                Ok(names) => {
                    info!("loaded {} artist name(s) from {:?}", names.len(), path);
                    names
                }
                Err(error) => {
                    warn!("artist name cache {:?} is unreadable ({error}); starting empty", path);
                    BTreeMap::new()
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => {
                warn!("could not read artist name cache {:?} ({error}); starting empty", path);
                BTreeMap::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            names,
            misses_since_flush: 0,
        }
    }

    /// Resolves an artist's display name.
    ///
    /// The various-artists sentinel short-circuits with no I/O. Other ids
    /// hit the cache first and fall back to a fetch, with the disambiguation
    /// suffix stripped before storing. A failed fetch is propagated to the
    /// caller; there is no skip path.
    pub fn resolve(
        &mut self,
        artist_id: i64,
        source: &dyn MetadataSource,
    ) -> Result<String, FetchError> {
        if artist_id == VARIOUS_ARTISTS_ID {
            self.names
                .entry(VARIOUS_ARTISTS_ID)
                .or_insert_with(|| VARIOUS_ARTISTS_NAME.to_string());
            return Ok(VARIOUS_ARTISTS_NAME.to_string());
        }
        if let Some(name) = self.names.get(&artist_id) {
            debug!("artist {artist_id} found in cache");
            return Ok(name.clone());
        }
        info!("downloading name for artist {artist_id}");
        let name = clean_artist_name(&source.artist_name(artist_id)?);
        self.names.insert(artist_id, name.clone());
        self.misses_since_flush += 1;
        if self.misses_since_flush >= FLUSH_EVERY {
            if let Err(error) = self.flush() {
                warn!("periodic artist name cache flush failed: {error:#}");
            }
            self.misses_since_flush = 0;
        }
        Ok(name)
    }

    /// Writes the cache file out.
    pub fn flush(&self) -> Result<()> {
        let payload =
            serde_json::to_string_pretty(&self.names).context("serializing artist name cache")?;
        fs::write(&self.path, payload)
            .with_context(|| format!("writing artist name cache to {:?}", self.path))
    }

    pub fn contains(&self, artist_id: i64) -> bool {
        self.names.contains_key(&artist_id)
    }

    /// (id, name) pairs ordered by id. The export enumerates these to build
    /// the artist table, so the order is part of the output contract.
    pub fn entries(&self) -> impl Iterator<Item = (i64, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discogs::MetadataBlob;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct NameSource {
        names: BTreeMap<i64, String>,
        calls: RefCell<usize>,
    }

    impl NameSource {
        fn new(pairs: &[(i64, &str)]) -> Self {
            Self {
                names: pairs
                    .iter()
                    .map(|(id, name)| (*id, name.to_string()))
                    .collect(),
                calls: RefCell::new(0),
            }
        }
    }

    impl MetadataSource for NameSource {
        fn master(&self, id: u64) -> Result<MetadataBlob, FetchError> {
            Err(FetchError::NotFound(format!("master {id}")))
        }

        fn release(&self, id: u64) -> Result<MetadataBlob, FetchError> {
            Err(FetchError::NotFound(format!("release {id}")))
        }

        fn artist_name(&self, id: i64) -> Result<String, FetchError> {
            *self.calls.borrow_mut() += 1;
            self.names
                .get(&id)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(format!("artist {id}")))
        }
    }

    struct PanicSource;

    impl MetadataSource for PanicSource {
        fn master(&self, _id: u64) -> Result<MetadataBlob, FetchError> {
            panic!("unexpected master fetch");
        }

        fn release(&self, _id: u64) -> Result<MetadataBlob, FetchError> {
            panic!("unexpected release fetch");
        }

        fn artist_name(&self, _id: i64) -> Result<String, FetchError> {
            panic!("unexpected artist fetch");
        }
    }

    fn cache_in(dir: &TempDir) -> ArtistNameCache {
        ArtistNameCache::load(&dir.path().join("artist_names.json"))
    }

    #[test]
    fn test_sentinel_never_touches_the_network() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        assert_eq!(
            cache.resolve(VARIOUS_ARTISTS_ID, &PanicSource).unwrap(),
            "Various"
        );
        assert!(cache.contains(VARIOUS_ARTISTS_ID));
    }

    #[test]
    fn test_miss_downloads_and_strips_suffix() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        let source = NameSource::new(&[(123, "Sugar (3)")]);
        assert_eq!(cache.resolve(123, &source).unwrap(), "Sugar");
        assert_eq!(*source.calls.borrow(), 1);
    }

    #[test]
    fn test_hit_skips_the_network() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        let source = NameSource::new(&[(123, "Sugar")]);
        cache.resolve(123, &source).unwrap();
        assert_eq!(cache.resolve(123, &PanicSource).unwrap(), "Sugar");
    }

    #[test]
    fn test_unresolvable_artist_propagates() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        let source = NameSource::new(&[]);
        assert!(matches!(
            cache.resolve(999, &source),
            Err(FetchError::NotFound(_))
        ));
    }

    #[test]
    fn test_flush_and_reload_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artist_names.json");
        let mut cache = ArtistNameCache::load(&path);
        let source = NameSource::new(&[(7, "Herbie Hancock"), (3, "Can")]);
        cache.resolve(7, &source).unwrap();
        cache.resolve(3, &source).unwrap();
        cache.flush().unwrap();

        let reloaded = ArtistNameCache::load(&path);
        assert_eq!(reloaded.len(), 2);
        let entries: Vec<_> = reloaded.entries().collect();
        assert_eq!(entries, vec![(3, "Can"), (7, "Herbie Hancock")]);
    }

    #[test]
    fn test_corrupt_file_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artist_names.json");
        fs::write(&path, "{not json").unwrap();
        let cache = ArtistNameCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entries_are_ordered_by_id() {
        let dir = TempDir::new().unwrap();
        let mut cache = cache_in(&dir);
        let source = NameSource::new(&[(50, "B"), (2, "A"), (900, "C")]);
        for id in [50, 2, 900] {
            cache.resolve(id, &source).unwrap();
        }
        let ids: Vec<i64> = cache.entries().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2, 50, 900]);
    }
}
