//! Relational export: surrogate ids, artist identities, INSERT generation.

mod artist_names;
mod builder;
mod surrogate;

pub use artist_names::{ArtistNameCache, VARIOUS_ARTISTS_ID};
pub use builder::{
    build_statements, escape_apostrophes, prepare_batch, quote, write_statement_file, ExportBatch,
    ExportError, ExportVariant,
};
pub use surrogate::SurrogateRegistry;
