use crate::error::{AlignError, EmptyInputCause, Result};
use crate::types::{MergedTable, NamespacedTable, Row};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument, warn};

/// True when any exclusion entry is a (case-sensitive) substring of `source_id`.
pub fn is_excluded(source_id: &str, exclude: &[String]) -> bool {
    exclude.iter().any(|e| source_id.contains(e.as_str()))
}

/// Union all tables into one timestamp-sorted table.
///
/// Rows are concatenated, not combined: every input row becomes one output
/// row carrying values only in its own source's columns. The final sort is
/// stable, so rows sharing a timestamp keep their input order.
///
/// When two sources share a column name the column is shared too, and each
/// source writes into it at its own rows. After forward-fill that column
/// tracks whichever source observed last. This is reported through
/// [`MergedTable::collisions`] rather than resolved.
#[instrument(skip_all, fields(tables = tables.len()))]
pub fn merge(tables: Vec<NamespacedTable>, exclude: &[String]) -> Result<MergedTable> {
    if tables.is_empty() {
        return Err(AlignError::EmptyInput(EmptyInputCause::NoSources));
    }

    let (kept, dropped): (Vec<_>, Vec<_>) = tables
        .into_iter()
        .partition(|t| !is_excluded(&t.source_id, exclude));
    let excluded: Vec<String> = dropped.into_iter().map(|t| t.source_id).collect();
    for id in &excluded {
        debug!(source = %id, "Excluded source");
    }
    if kept.is_empty() {
        return Err(AlignError::EmptyInput(EmptyInputCause::AllExcluded));
    }

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut contributors: HashMap<String, Vec<String>> = HashMap::new();
    for table in &kept {
        for column in &table.columns {
            if !positions.contains_key(column) {
                positions.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
            contributors
                .entry(column.clone())
                .or_default()
                .push(table.source_id.clone());
        }
    }

    let collisions: BTreeMap<String, Vec<String>> = contributors
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .collect();
    for (column, sources) in &collisions {
        warn!(
            column = %column,
            sources = ?sources,
            "Column name collision; later observations overwrite earlier ones"
        );
    }

    let total_rows: usize = kept.iter().map(|t| t.rows.len()).sum();
    let mut rows = Vec::with_capacity(total_rows);
    for table in kept {
        let map: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
        for row in table.rows {
            let mut cells = vec![None; columns.len()];
            for (src, value) in row.cells.into_iter().enumerate() {
                if let Some(&dst) = map.get(src) {
                    cells[dst] = value;
                }
            }
            rows.push(Row::new(row.timestamp, cells));
        }
    }
    rows.sort_by_key(|r| r.timestamp);

    info!(
        rows = rows.len(),
        columns = columns.len(),
        excluded = excluded.len(),
        collisions = collisions.len(),
        "Merged sources"
    );
    Ok(MergedTable {
        columns,
        rows,
        collisions,
        excluded,
    })
}
