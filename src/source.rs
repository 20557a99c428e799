//! Raw export ingestion.
//!
//! A [`RawSource`] is one export file read verbatim: its headers and string
//! cells, tagged with an identifier (the file name) that later drives
//! platform inference. [`ingest`] concatenates any number of sources into a
//! [`RawTable`] whose columns are the union of every source's headers.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{error::PipelineError, io_utils};

#[derive(Debug, Clone, PartialEq)]
pub struct RawSource {
    pub id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// SHA-256 of the bytes the source was parsed from, hex encoded.
    pub digest: String,
}

impl RawSource {
    pub fn new(id: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            id: id.into(),
            headers,
            rows,
            digest: String::new(),
        }
    }

    /// Parses delimited text already held in memory.
    pub fn from_bytes(
        id: impl Into<String>,
        bytes: &[u8],
        delimiter: u8,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let id = id.into();
        let mut reader = io_utils::open_csv_reader(bytes, delimiter);
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading headers of '{id}'"))?;
        let mut rows = Vec::new();
        for (row_idx, record) in reader.byte_records().enumerate() {
            let record = record.with_context(|| format!("Reading row {} of '{id}'", row_idx + 2))?;
            let decoded = io_utils::decode_record(&record, encoding)
                .with_context(|| format!("Decoding row {} of '{id}'", row_idx + 2))?;
            if decoded.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(decoded);
        }
        Ok(Self {
            id,
            headers,
            rows,
            digest: hex_digest(bytes),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub id: String,
    pub rows: usize,
    pub digest: String,
}

impl From<&RawSource> for SourceSummary {
    fn from(source: &RawSource) -> Self {
        Self {
            id: source.id.clone(),
            rows: source.rows.len(),
            digest: source.digest.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub source: String,
    /// Position of the contributing source in [`RawTable::sources`].
    pub origin: usize,
    /// One cell per [`RawTable::columns`] entry; `None` where the source lacked the column.
    pub cells: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
    pub sources: Vec<SourceSummary>,
    /// Per source, the table columns its headers landed on, in header order.
    pub layouts: Vec<Vec<usize>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn append(&mut self, source: RawSource) {
        let mut positions = HashMap::with_capacity(self.columns.len());
        for (idx, column) in self.columns.iter().enumerate() {
            positions.insert(column.clone(), idx);
        }
        let mut mapping = Vec::with_capacity(source.headers.len());
        for header in &source.headers {
            let idx = match positions.get(header) {
                Some(idx) => *idx,
                None => {
                    self.columns.push(header.clone());
                    positions.insert(header.clone(), self.columns.len() - 1);
                    self.columns.len() - 1
                }
            };
            mapping.push(idx);
        }
        let origin = self.sources.len();
        self.sources.push(SourceSummary::from(&source));
        for row in source.rows {
            let mut cells = vec![None; self.columns.len()];
            for (cell_idx, cell) in row.into_iter().enumerate() {
                if let Some(target) = mapping.get(cell_idx) {
                    cells[*target] = Some(cell);
                }
            }
            self.rows.push(RawRow {
                source: source.id.clone(),
                origin,
                cells,
            });
        }
        self.layouts.push(mapping);
        let width = self.columns.len();
        for row in &mut self.rows {
            row.cells.resize(width, None);
        }
    }
}

/// Reads one export file. Any failure is a recoverable [`PipelineError::SourceRead`].
pub fn read_source(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<RawSource, PipelineError> {
    let id = source_id(path);
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    let bytes =
        io_utils::read_file_bytes(path).map_err(|err| PipelineError::source_read(&id, format!("{err:#}")))?;
    RawSource::from_bytes(id.clone(), &bytes, delimiter, encoding)
        .map_err(|err| PipelineError::source_read(&id, format!("{err:#}")))
}

pub fn read_sources(
    paths: &[PathBuf],
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Vec<Result<RawSource, PipelineError>> {
    paths
        .iter()
        .map(|path| read_source(path, delimiter, encoding))
        .collect()
}

/// Concatenates sources row-wise.
///
/// Sources that failed to read, or that hold no data rows, are skipped with a
/// warning. Fails with [`PipelineError::InputNotFound`] when no sources were
/// offered and [`PipelineError::NoUsableData`] when none contributed rows.
pub fn ingest<I>(sources: I) -> Result<RawTable, PipelineError>
where
    I: IntoIterator<Item = Result<RawSource, PipelineError>>,
{
    let mut table = RawTable::default();
    let mut attempted = 0usize;
    for source in sources {
        attempted += 1;
        match source {
            Ok(source) if source.rows.is_empty() => {
                warn!("Skipping '{}': no data rows", source.id);
            }
            Ok(source) => {
                info!(
                    "Ingested {} row(s) across {} column(s) from '{}'",
                    source.rows.len(),
                    source.headers.len(),
                    source.id
                );
                table.append(source);
            }
            Err(err) if err.is_recoverable() => warn!("Skipping source: {err}"),
            Err(err) => return Err(err),
        }
    }
    if attempted == 0 {
        return Err(PipelineError::InputNotFound);
    }
    if table.is_empty() {
        return Err(PipelineError::NoUsableData { attempted });
    }
    Ok(table)
}

fn source_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
