//! Metrics for the aligner, recorded through the `metrics` facade.
//!
//! Nothing is exported unless the embedding application installs a
//! recorder; without one every call here is a no-op.

use std::fmt;

/// Every metric name the pipeline records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Ingestion
    SourcesLoaded,
    SourcesExcluded,
    SourceRowsLoaded,
    LoadDuration,

    // Merge
    MergedRows,
    ColumnCollisions,

    // Normalize
    SentinelRowsDropped,
    DuplicateTimestampsDropped,
    DuplicateRowsDropped,

    // Resample
    ResampledRows,
    PeriodMicros,

    // Sessions
    SessionsSucceeded,
    SessionsFailed,
    SessionsReused,
    SessionDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourcesLoaded => "aligner_sources_loaded_total",
            MetricName::SourcesExcluded => "aligner_sources_excluded_total",
            MetricName::SourceRowsLoaded => "aligner_source_rows_loaded_total",
            MetricName::LoadDuration => "aligner_load_duration_seconds",
            MetricName::MergedRows => "aligner_merged_rows",
            MetricName::ColumnCollisions => "aligner_column_collisions_total",
            MetricName::SentinelRowsDropped => "aligner_sentinel_rows_dropped_total",
            MetricName::DuplicateTimestampsDropped => "aligner_duplicate_timestamps_dropped_total",
            MetricName::DuplicateRowsDropped => "aligner_duplicate_rows_dropped_total",
            MetricName::ResampledRows => "aligner_resampled_rows",
            MetricName::PeriodMicros => "aligner_period_micros",
            MetricName::SessionsSucceeded => "aligner_sessions_succeeded_total",
            MetricName::SessionsFailed => "aligner_sessions_failed_total",
            MetricName::SessionsReused => "aligner_sessions_reused_total",
            MetricName::SessionDuration => "aligner_session_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub mod ingestion {
    use super::MetricName;

    pub fn sources_loaded(count: usize, rows: usize, duration_secs: f64) {
        ::metrics::counter!(MetricName::SourcesLoaded.as_str()).increment(count as u64);
        ::metrics::counter!(MetricName::SourceRowsLoaded.as_str()).increment(rows as u64);
        ::metrics::histogram!(MetricName::LoadDuration.as_str()).record(duration_secs);
    }

    pub fn sources_excluded(count: usize) {
        ::metrics::counter!(MetricName::SourcesExcluded.as_str()).increment(count as u64);
    }
}

pub mod merge {
    use super::MetricName;

    pub fn merged(rows: usize, collisions: usize) {
        ::metrics::histogram!(MetricName::MergedRows.as_str()).record(rows as f64);
        if collisions > 0 {
            ::metrics::counter!(MetricName::ColumnCollisions.as_str())
                .increment(collisions as u64);
        }
    }
}

pub mod normalize {
    use super::MetricName;
    use crate::types::NormalizeStats;

    pub fn normalized(stats: &NormalizeStats) {
        ::metrics::counter!(MetricName::SentinelRowsDropped.as_str())
            .increment(stats.sentinel_rows_dropped as u64);
        ::metrics::counter!(MetricName::DuplicateTimestampsDropped.as_str())
            .increment(stats.duplicate_timestamps_dropped as u64);
        ::metrics::counter!(MetricName::DuplicateRowsDropped.as_str())
            .increment(stats.duplicate_rows_dropped as u64);
    }
}

pub mod resample {
    use super::MetricName;

    pub fn resampled(rows: usize, period_micros: i64) {
        ::metrics::histogram!(MetricName::ResampledRows.as_str()).record(rows as f64);
        ::metrics::gauge!(MetricName::PeriodMicros.as_str()).set(period_micros as f64);
    }
}

pub mod session {
    use super::MetricName;

    pub fn succeeded(duration_secs: f64) {
        ::metrics::counter!(MetricName::SessionsSucceeded.as_str()).increment(1);
        ::metrics::histogram!(MetricName::SessionDuration.as_str()).record(duration_secs);
    }

    pub fn reused() {
        ::metrics::counter!(MetricName::SessionsReused.as_str()).increment(1);
    }

    pub fn failed(stage: &'static str) {
        ::metrics::counter!(MetricName::SessionsFailed.as_str(), "stage" => stage).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            MetricName::SourcesLoaded,
            MetricName::SentinelRowsDropped,
            MetricName::SessionDuration,
        ] {
            assert!(name.to_string().starts_with("aligner_"));
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        ingestion::sources_loaded(3, 30, 0.1);
        session::failed("load");
    }
}
