//! Canonical discography metadata: references, transport, caching.

mod cache;
mod client;
mod models;
mod pacer;
mod reference;
mod retry;

pub use cache::{CacheError, MetadataCache, ResolvedMetadata};
pub use client::{FetchError, HttpMetadataSource, MetadataSource};
pub use models::{clean_artist_name, ArtistCredit, Credit, Image, MetadataBlob};
pub use pacer::RequestPacer;
pub use reference::{normalize_link, CanonicalRef, LinkError, NormalizeError, RefKind};
pub use retry::RetryPolicy;
