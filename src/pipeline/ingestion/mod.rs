// Source discovery and loading: one delimited file per topic -> SourceTable

use crate::constants::{MISSING_VALUE_TOKENS, SOURCE_EXTENSION};
use crate::error::{AlignError, Result};
use crate::types::{Micros, Row, SourceTable};
use csv::{ReaderBuilder, StringRecord, Trim};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// List the tabular files directly inside `dir`, sorted by file name.
///
/// Subdirectories are never entered, which keeps the output directory out
/// of the input set.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let unreadable = |e: std::io::Error| AlignError::parse(dir, 0, format!("unreadable directory: {e}"));
    let entries = fs::read_dir(dir).map_err(unreadable)?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        let is_file = entry.file_type().map(|t| t.is_file()).map_err(unreadable)?;
        let is_source = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == SOURCE_EXTENSION)
            .unwrap_or(false);
        if is_file && is_source {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// File name minus extension.
pub fn source_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse one source file. The first column is the integer timestamp index,
/// every other column is numeric; empty cells are read as absent.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_source(path: &Path) -> Result<SourceTable> {
    let source_id = source_id_from_path(path);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| AlignError::parse(path, 0, format!("unreadable: {e}")))?;

    let headers = reader
        .headers()
        .map_err(|e| csv_to_parse(path, e))?
        .clone();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(AlignError::parse(path, 1, "missing header row"));
    }

    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let mut seen = HashSet::new();
    for column in &columns {
        if !seen.insert(column.as_str()) {
            return Err(AlignError::parse(
                path,
                1,
                format!("duplicate column '{column}'"),
            ));
        }
    }

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    let mut previous: Option<Micros> = None;
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(csv_to_parse(path, e)),
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row = parse_row(path, line, &record, columns.len())?;
        if previous.is_some_and(|p| row.timestamp < p) {
            debug!(line, "timestamp goes backwards; merge will reorder");
        }
        previous = Some(row.timestamp);
        rows.push(row);
    }

    debug!(source = %source_id, rows = rows.len(), columns = columns.len(), "Loaded source");
    Ok(SourceTable {
        source_id,
        columns,
        rows,
    })
}

/// Load many sources in parallel. Output order follows `paths`.
pub fn load_sources(paths: &[PathBuf]) -> Result<Vec<SourceTable>> {
    paths.par_iter().map(|p| load_source(p)).collect()
}

fn parse_row(path: &Path, line: u64, record: &StringRecord, width: usize) -> Result<Row> {
    let raw_ts = record.get(0).unwrap_or("");
    let timestamp = parse_timestamp(raw_ts).ok_or_else(|| {
        AlignError::parse(path, line, format!("non-numeric timestamp '{raw_ts}'"))
    })?;

    // The csv reader rejects records whose width differs from the header
    let mut cells = Vec::with_capacity(width);
    for (i, field) in record.iter().skip(1).enumerate() {
        if is_missing(field) {
            cells.push(None);
            continue;
        }
        let value: f64 = field.parse().map_err(|_| {
            let column = i + 1;
            AlignError::parse(
                path,
                line,
                format!("non-numeric value '{field}' in column {column}"),
            )
        })?;
        // "NAN", "+nan" and friends parse to NaN; they are gaps too
        cells.push(Some(value).filter(|v| !v.is_nan()));
    }
    Ok(Row::new(timestamp, cells))
}

fn is_missing(field: &str) -> bool {
    field.is_empty() || MISSING_VALUE_TOKENS.contains(&field)
}

fn parse_timestamp(raw: &str) -> Option<Micros> {
    if let Ok(v) = raw.parse::<Micros>() {
        return Some(v);
    }
    // Some exporters write integral floats ("1234.0").
    let v: f64 = raw.parse().ok()?;
    (v.is_finite() && v.fract() == 0.0).then_some(v as Micros)
}

fn csv_to_parse(path: &Path, e: csv::Error) -> AlignError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    AlignError::parse(path, line, e.to_string())
}
