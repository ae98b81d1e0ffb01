//! Worksheet row transport.
//!
//! The real catalog lives in a hosted spreadsheet; that I/O belongs to an
//! external collaborator. This module defines the boundary and ships a plain
//! tab-separated file implementation so the pipeline runs end to end.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Source and sink for raw worksheet rows. The first row is a header and is
/// passed through untouched.
pub trait RowTransport {
    fn read_rows(&self) -> Result<Vec<Vec<String>>>;
    fn write_rows(&self, rows: &[Vec<String>]) -> Result<()>;
}

/// Tab-separated file transport. Cells must not contain tabs or newlines.
pub struct TsvRowTransport {
    path: PathBuf,
}

impl TsvRowTransport {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RowTransport for TsvRowTransport {
    fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading worksheet rows from {:?}", self.path))?;
        Ok(text
            .lines()
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect())
    }

    fn write_rows(&self, rows: &[Vec<String>]) -> Result<()> {
        let mut out = String::new();
        for row in rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        fs::write(&self.path, out)
            .with_context(|| format!("writing worksheet rows to {:?}", self.path))
    }
}
