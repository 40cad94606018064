use serde::Serialize;
use std::collections::BTreeMap;

/// Timestamps are integer microseconds throughout the pipeline.
pub type Micros = i64;

/// One observation instant. `None` marks a cell with no observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub timestamp: Micros,
    pub cells: Vec<Option<f64>>,
}

impl Row {
    pub fn new(timestamp: Micros, cells: Vec<Option<f64>>) -> Self {
        Self { timestamp, cells }
    }
}

/// A single per-topic log as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    /// File name without extension.
    pub source_id: String,
    /// Data columns in header order, timestamp column excluded.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl SourceTable {
    pub fn timestamps(&self) -> impl Iterator<Item = Micros> + '_ {
        self.rows.iter().map(|r| r.timestamp)
    }
}

/// A source whose columns carry the `{source_id}_{column}` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespacedTable {
    pub source_id: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Union of all namespaced sources, sorted by timestamp.
///
/// Rows from different sources are never combined here: a timestamp seen by
/// two sources produces two rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Column names produced by more than one source, with the contributing source ids.
    pub collisions: BTreeMap<String, Vec<String>>,
    /// Source ids dropped by the exclusion filter.
    pub excluded: Vec<String>,
}

/// Counts of what the normalizer discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NormalizeStats {
    pub sentinel_rows_dropped: usize,
    pub duplicate_timestamps_dropped: usize,
    pub duplicate_rows_dropped: usize,
}

/// Gap-free table with strictly increasing timestamps starting at zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedTable {
    pub columns: Vec<String>,
    pub timestamps: Vec<Micros>,
    pub rows: Vec<Vec<f64>>,
    pub stats: NormalizeStats,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last timestamp, i.e. the session duration after rebasing.
    pub fn max_timestamp(&self) -> Option<Micros> {
        self.timestamps.last().copied()
    }
}

/// Table evaluated on the grid `0, p, 2p, ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledTable {
    pub columns: Vec<String>,
    pub period_micros: Micros,
    pub rows: Vec<Vec<f64>>,
}

impl ResampledTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Grid timestamp of row `i`.
    pub fn timestamp_at(&self, i: usize) -> Micros {
        i as Micros * self.period_micros
    }

    pub fn index(&self) -> impl Iterator<Item = Micros> + '_ {
        (0..self.rows.len()).map(move |i| self.timestamp_at(i))
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }
}
