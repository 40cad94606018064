use crate::constants::SENTINEL_TIMESTAMP;
use crate::error::{AlignError, Result};
use crate::types::{Micros, NormalizedTable, ResampledTable, SourceTable};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Chooses the resample period for a session.
pub trait PeriodPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Pick a period in microseconds from the loaded sources.
    fn select(&self, sources: &[SourceTable]) -> Result<Micros>;
}

/// Always the configured period.
#[derive(Debug, Clone, Copy)]
pub struct FixedPeriod(pub Micros);

impl PeriodPolicy for FixedPeriod {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn select(&self, _sources: &[SourceTable]) -> Result<Micros> {
        validate_period(self.0)
    }
}

/// Smallest positive gap between consecutive samples of any one source.
///
/// Unreliable on real logs: a single jittered pair of samples drives the
/// period down to a few microseconds. Opt-in only.
#[derive(Debug, Clone, Copy)]
pub struct MinimumGapPeriod {
    /// Used when no source has two distinct non-sentinel timestamps.
    pub fallback: Micros,
}

impl PeriodPolicy for MinimumGapPeriod {
    fn name(&self) -> &'static str {
        "min_gap"
    }

    fn select(&self, sources: &[SourceTable]) -> Result<Micros> {
        let observed = sources
            .iter()
            .filter_map(|s| minimum_gap(s.timestamps()))
            .min();
        match observed {
            Some(gap) => {
                info!(gap, "Inferred resample period from minimum sample gap");
                Ok(gap)
            }
            None => {
                warn!(fallback = self.fallback, "No sample gap observed; using fallback period");
                validate_period(self.fallback)
            }
        }
    }
}

fn minimum_gap(timestamps: impl Iterator<Item = Micros>) -> Option<Micros> {
    let mut previous: Option<Micros> = None;
    let mut best: Option<Micros> = None;
    for ts in timestamps.filter(|&t| t != SENTINEL_TIMESTAMP) {
        if let Some(p) = previous {
            let gap = ts - p;
            if gap > 0 && best.map_or(true, |b| gap < b) {
                best = Some(gap);
            }
        }
        previous = Some(ts);
    }
    best
}

/// Config-facing selector for [`PeriodPolicy`] implementations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPolicyKind {
    #[default]
    Fixed,
    MinGap,
}

impl PeriodPolicyKind {
    pub fn build(self, period_micros: Micros) -> Box<dyn PeriodPolicy> {
        match self {
            PeriodPolicyKind::Fixed => Box::new(FixedPeriod(period_micros)),
            PeriodPolicyKind::MinGap => Box::new(MinimumGapPeriod {
                fallback: period_micros,
            }),
        }
    }
}

pub fn validate_period(period_micros: Micros) -> Result<Micros> {
    if period_micros <= 0 {
        return Err(AlignError::InvalidPeriod(period_micros));
    }
    Ok(period_micros)
}

/// Evaluate `table` on the grid `0, p, 2p, ...` up to its last timestamp.
///
/// Each grid point takes the last row at or before it. Grid points before
/// the first row take the first row. A final grid point is emitted only
/// while it does not pass the last timestamp, giving `max / p + 1` rows.
#[instrument(skip_all, fields(rows = table.len(), period_micros = period_micros))]
pub fn resample(table: &NormalizedTable, period_micros: Micros) -> Result<ResampledTable> {
    let period = validate_period(period_micros)?;

    let Some(max_ts) = table.max_timestamp() else {
        return Ok(ResampledTable {
            columns: table.columns.clone(),
            period_micros: period,
            rows: Vec::new(),
        });
    };

    let points = (max_ts.max(0) / period) as usize + 1;
    let mut rows = Vec::with_capacity(points);
    let mut cursor = 0usize;
    for k in 0..points {
        let t = k as Micros * period;
        while cursor + 1 < table.timestamps.len() && table.timestamps[cursor + 1] <= t {
            cursor += 1;
        }
        rows.push(table.rows[cursor].clone());
    }

    info!(points = rows.len(), period_micros = period, "Resampled onto regular grid");
    Ok(ResampledTable {
        columns: table.columns.clone(),
        period_micros: period,
        rows,
    })
}
