//! CSV column source.
//!
//! ## Layout
//!
//! | Server | Laptop  |
//! |--------|---------|
//! | web-1  | lt-007  |
//! | web-2  |         |
//!
//! The header row names the types. Every non-empty cell below a header is
//! one record `(header, cell)`. Records are emitted column by column, so the
//! type order of the resulting group follows the header order. Cells past
//! the last header are ignored.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::info;
use tsync_reconcile::SourceRecord;

use crate::fetcher::{SourceBatch, SourceError, SourceFetcher};

#[derive(Debug, Clone)]
pub struct CsvColumnSource {
    path: PathBuf,
}

impl CsvColumnSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SourceFetcher for CsvColumnSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn fetch(&self) -> Result<SourceBatch, SourceError> {
        let file = std::fs::File::open(&self.path)
            .map_err(|e| SourceError::Io(format!("open '{}': {e}", self.path.display())))?;
        let records = parse_csv_records(file)?;
        info!(
            path = %self.path.display(),
            records = records.len(),
            "csv source read"
        );
        Ok(SourceBatch::complete(records, 1))
    }
}

/// Parse column-per-type CSV into records. See the module docs for layout.
///
/// A blank header yields records with no type; the aggregator reports them.
pub fn parse_csv_records<R: Read>(reader: R) -> Result<Vec<SourceRecord>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<Option<String>> = rdr
        .headers()
        .map_err(|e| SourceError::Io(format!("csv header: {e}")))?
        .iter()
        .map(|h| (!h.is_empty()).then(|| h.to_string()))
        .collect();

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (row, rec) in rdr.records().enumerate() {
        // Row 1 is the header.
        let rec = rec.map_err(|e| SourceError::Io(format!("csv row {}: {e}", row + 2)))?;
        for (cell, column) in rec.iter().zip(columns.iter_mut()) {
            if !cell.is_empty() {
                column.push(cell.to_string());
            }
        }
    }

    Ok(headers
        .into_iter()
        .zip(columns)
        .flat_map(|(type_name, cells)| {
            cells.into_iter().map(move |label| SourceRecord {
                type_name: type_name.clone(),
                label: Some(label),
            })
        })
        .collect())
}
