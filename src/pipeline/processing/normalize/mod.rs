use crate::constants::SENTINEL_TIMESTAMP;
use crate::error::{AlignError, EmptyInputCause, Result};
use crate::types::{MergedTable, Micros, NormalizeStats, NormalizedTable, Row};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Clean a merged table into a gap-free, strictly increasing table.
///
/// Steps run in this order:
/// 1. drop rows stamped with the sentinel `0`
/// 2. rebase so the earliest remaining timestamp is `0`
/// 3. forward-fill each column, zero-filling before its first observation
/// 4. keep only the first row of each timestamp
/// 5. drop rows whose values repeat an already kept row
///
/// Forward-fill runs before the timestamp dedup, so values from a discarded
/// same-timestamp row still reach the rows after it.
#[instrument(skip_all, fields(rows = merged.rows.len()))]
pub fn normalize(merged: MergedTable) -> Result<NormalizedTable> {
    let MergedTable { columns, rows, .. } = merged;
    let mut stats = NormalizeStats::default();

    let before = rows.len();
    let rows: Vec<Row> = rows
        .into_iter()
        .filter(|r| r.timestamp != SENTINEL_TIMESTAMP)
        .collect();
    stats.sentinel_rows_dropped = before - rows.len();
    if rows.is_empty() {
        return Err(AlignError::EmptyInput(EmptyInputCause::AllSentinel));
    }
    debug_assert!(rows.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    let origin = rows
        .iter()
        .map(|r| r.timestamp)
        .min()
        .unwrap_or(SENTINEL_TIMESTAMP);
    debug!(origin, "Rebasing session time");

    let filled = forward_fill(rows, columns.len(), origin);

    let mut timestamps: Vec<Micros> = Vec::with_capacity(filled.len());
    let mut values: Vec<Vec<f64>> = Vec::with_capacity(filled.len());
    for (ts, row) in filled {
        if timestamps.last() == Some(&ts) {
            stats.duplicate_timestamps_dropped += 1;
            continue;
        }
        timestamps.push(ts);
        values.push(row);
    }

    let table = NormalizedTable {
        columns,
        timestamps,
        rows: values,
        stats,
    };
    let table = dedup_rows(&table);

    info!(
        rows = table.len(),
        sentinel_dropped = table.stats.sentinel_rows_dropped,
        duplicate_timestamps = table.stats.duplicate_timestamps_dropped,
        duplicate_rows = table.stats.duplicate_rows_dropped,
        "Normalized merged table"
    );
    Ok(table)
}

/// Rebase and fill every absent cell with the last value seen in its column,
/// or `0.0` if the column has not been observed yet. A NaN cell counts as
/// absent.
fn forward_fill(rows: Vec<Row>, width: usize, origin: Micros) -> Vec<(Micros, Vec<f64>)> {
    let mut last: Vec<f64> = vec![0.0; width];
    rows.into_iter()
        .map(|row| {
            for (slot, cell) in last.iter_mut().zip(row.cells) {
                if let Some(v) = cell.filter(|v| !v.is_nan()) {
                    *slot = v;
                }
            }
            (row.timestamp - origin, last.clone())
        })
        .collect()
}

/// Drop every row whose values are bit-identical to an earlier kept row.
///
/// Only the values are compared, the timestamp is not. Applying this to its
/// own output changes nothing.
pub fn dedup_rows(table: &NormalizedTable) -> NormalizedTable {
    let mut seen: HashSet<Vec<u64>> = HashSet::with_capacity(table.rows.len());
    let mut timestamps = Vec::with_capacity(table.rows.len());
    let mut rows = Vec::with_capacity(table.rows.len());
    let mut dropped = 0;
    for (ts, row) in table.timestamps.iter().zip(&table.rows) {
        let key: Vec<u64> = row.iter().map(|v| v.to_bits()).collect();
        if seen.insert(key) {
            timestamps.push(*ts);
            rows.push(row.clone());
        } else {
            dropped += 1;
        }
    }
    let mut stats = table.stats;
    stats.duplicate_rows_dropped = dropped;
    NormalizedTable {
        columns: table.columns.clone(),
        timestamps,
        rows,
        stats,
    }
}
