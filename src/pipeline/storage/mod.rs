// Output sink: resampled table -> one CSV per session

use crate::constants::{INDEX_LABEL, SOURCE_EXTENSION};
use crate::error::{AlignError, Result};
use crate::types::ResampledTable;
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// `{file_suffix}{token}.csv`, e.g. `log_7_combined.csv`.
pub fn output_file_name(file_suffix: &str, token: &str) -> String {
    format!("{file_suffix}{token}.{SOURCE_EXTENSION}")
}

/// Write `table` to `dest_dir/file_name`, creating `dest_dir` if needed.
///
/// The table goes to a `.partial` sibling first and is renamed into place
/// once complete, so a failure never leaves a truncated output behind.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn write_resampled(table: &ResampledTable, dest_dir: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(dest_dir).map_err(|e| AlignError::io(dest_dir, e))?;

    let final_path = dest_dir.join(file_name);
    let partial_path = dest_dir.join(format!("{file_name}.partial"));

    if let Err(e) = write_csv(table, &partial_path) {
        if let Err(cleanup) = fs::remove_file(&partial_path) {
            warn!(path = %partial_path.display(), error = %cleanup, "Failed to remove partial output");
        }
        return Err(e);
    }
    fs::rename(&partial_path, &final_path).map_err(|e| AlignError::io(&final_path, e))?;

    info!(path = %final_path.display(), "Wrote resampled table");
    Ok(final_path)
}

fn write_csv(table: &ResampledTable, path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| csv_to_io(path, e))?;

    let header = std::iter::once(INDEX_LABEL).chain(table.columns.iter().map(String::as_str));
    writer.write_record(header).map_err(|e| csv_to_io(path, e))?;

    let mut record: Vec<String> = Vec::with_capacity(table.columns.len() + 1);
    for (ts, row) in table.index().zip(&table.rows) {
        record.clear();
        record.push(ts.to_string());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(|e| csv_to_io(path, e))?;
    }
    writer.flush().map_err(|e| AlignError::io(path, e))?;
    Ok(())
}

fn csv_to_io(path: &Path, e: csv::Error) -> AlignError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => AlignError::io(path, io),
        other => AlignError::io(path, std::io::Error::other(format!("{other:?}"))),
    }
}
