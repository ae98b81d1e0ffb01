//! Per-run pipeline state.

use anyhow::Result;

use crate::config::AppConfig;
use crate::discogs::MetadataCache;
use crate::export::{ArtistNameCache, SurrogateRegistry};

/// Everything a pipeline run mutates, bundled and passed explicitly.
///
/// Constructed once per run. The metadata and artist-name caches are durable
/// across runs; the three surrogate registries are run-scoped and rebuilt
/// for every export.
pub struct RunContext {
    pub metadata_cache: MetadataCache,
    pub artist_names: ArtistNameCache,
    pub reasons: SurrogateRegistry,
    pub genres: SurrogateRegistry,
    pub styles: SurrogateRegistry,
}

impl RunContext {
    pub fn initialize(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            metadata_cache: MetadataCache::open(
                &config.metadata_cache_path(),
                config.cache_ttl_weeks,
            )?,
            artist_names: ArtistNameCache::load(&config.artist_names_path()),
            reasons: SurrogateRegistry::new(),
            genres: SurrogateRegistry::new(),
            styles: SurrogateRegistry::new(),
        })
    }

    /// Starts a fresh surrogate id space; each export variant gets its own.
    pub fn reset_registries(&mut self) {
        self.reasons = SurrogateRegistry::new();
        self.genres = SurrogateRegistry::new();
        self.styles = SurrogateRegistry::new();
    }
}
