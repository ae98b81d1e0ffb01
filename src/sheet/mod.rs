//! Worksheet rows: raw records, validated records, and transport.

mod row;
mod transport;

pub use row::{
    join_descriptors, split_descriptors, AlbumRecord, RowError, SeparatorPolicy, SheetRow,
    COLUMN_COUNT, COMPOUND_DESCRIPTORS,
};
pub use transport::{RowTransport, TsvRowTransport};
