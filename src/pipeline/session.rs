use crate::config::Config;
use crate::constants::frequency_hz;
use crate::error::{AlignError, EmptyInputCause, Result};
use crate::observability::metrics;
use crate::pipeline::ingestion::{discover_sources, load_sources, source_id_from_path};
use crate::pipeline::processing::merge::{is_excluded, merge};
use crate::pipeline::processing::namespace::{namespace, run_identifier};
use crate::pipeline::processing::normalize::normalize;
use crate::pipeline::processing::resample::{resample, PeriodPolicy};
use crate::pipeline::storage::{output_file_name, write_resampled};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Settings shared by every session of a run.
#[derive(Clone)]
pub struct PipelineOptions {
    pub exclude: Vec<String>,
    pub period_policy: Arc<dyn PeriodPolicy>,
    /// Output directory name, created inside each session's input directory.
    pub output_dir_name: String,
    /// Token appended to the per-session suffix in the output file name.
    pub output_suffix: String,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        let policy = config.resample.policy.build(config.resample.period_micros);
        Self {
            exclude: config.merge.exclude.clone(),
            period_policy: Arc::from(policy),
            output_dir_name: config.output.dir_name.clone(),
            output_suffix: config.output.suffix.clone(),
        }
    }

    /// Where a session's output lands.
    pub fn output_path(&self, input_dir: &Path, file_suffix: &str) -> PathBuf {
        input_dir
            .join(&self.output_dir_name)
            .join(output_file_name(file_suffix, &self.output_suffix))
    }
}

/// Summary of one session's core run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub file_suffix: String,
    pub run_identifier: String,
    pub sources_loaded: usize,
    pub sources_excluded: Vec<String>,
    pub merged_rows: usize,
    pub sentinel_rows_dropped: usize,
    pub duplicate_timestamps_dropped: usize,
    pub duplicate_rows_dropped: usize,
    pub normalized_rows: usize,
    pub resampled_rows: usize,
    pub columns: usize,
    pub period_micros: i64,
    pub frequency_hz: f64,
    pub period_policy: String,
    pub collisions: BTreeMap<String, Vec<String>>,
    pub output_file: PathBuf,
    pub finished_at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

pub struct Pipeline;

impl Pipeline {
    /// Load, namespace, merge, normalize, resample and write one session.
    ///
    /// Either the full output file is written or nothing is.
    #[instrument(skip(options), fields(input_dir = %input_dir.display()))]
    pub fn run_session_core(
        input_dir: &Path,
        file_suffix: &str,
        options: &PipelineOptions,
    ) -> Result<PipelineResult> {
        let started = Instant::now();
        let run_id = run_identifier(input_dir);
        info!(run_id = %run_id, "Starting session pipeline");

        // Step 1: discover and load
        let discovered = discover_sources(input_dir)?;
        if discovered.is_empty() {
            return Err(AlignError::EmptyInput(EmptyInputCause::NoSources));
        }
        let (kept, skipped): (Vec<PathBuf>, Vec<PathBuf>) = discovered
            .into_iter()
            .partition(|p| !is_excluded(&source_id_from_path(p), &options.exclude));
        let mut sources_excluded: Vec<String> =
            skipped.iter().map(|p| source_id_from_path(p)).collect();
        metrics::ingestion::sources_excluded(sources_excluded.len());
        if kept.is_empty() {
            return Err(AlignError::EmptyInput(EmptyInputCause::AllExcluded));
        }

        let t_load = Instant::now();
        let sources = load_sources(&kept)?;
        let source_rows: usize = sources.iter().map(|s| s.rows.len()).sum();
        metrics::ingestion::sources_loaded(sources.len(), source_rows, t_load.elapsed().as_secs_f64());
        info!(sources = sources.len(), rows = source_rows, excluded = sources_excluded.len(), "Loaded sources");

        let period_micros = options.period_policy.select(&sources)?;
        debug!(policy = options.period_policy.name(), period_micros, "Selected resample period");
        let sources_loaded = sources.len();

        // Step 2: namespace and merge
        let namespaced = sources.into_iter().map(|s| namespace(s, &run_id)).collect();
        let merged = merge(namespaced, &options.exclude)?;
        sources_excluded.extend(merged.excluded.iter().cloned());
        let merged_rows = merged.rows.len();
        let collisions = merged.collisions.clone();
        metrics::merge::merged(merged_rows, collisions.len());

        // Step 3: normalize
        let normalized = normalize(merged)?;
        metrics::normalize::normalized(&normalized.stats);

        // Step 4: resample
        let resampled = resample(&normalized, period_micros)?;
        metrics::resample::resampled(resampled.len(), period_micros);

        // Step 5: persist
        let output_path = options.output_path(input_dir, file_suffix);
        let dest_dir = output_path.parent().unwrap_or(input_dir);
        let file_name = output_file_name(file_suffix, &options.output_suffix);
        let output_file = write_resampled(&resampled, dest_dir, &file_name)?;

        let elapsed_secs = started.elapsed().as_secs_f64();
        Ok(PipelineResult {
            file_suffix: file_suffix.to_string(),
            run_identifier: run_id,
            sources_loaded,
            sources_excluded,
            merged_rows,
            sentinel_rows_dropped: normalized.stats.sentinel_rows_dropped,
            duplicate_timestamps_dropped: normalized.stats.duplicate_timestamps_dropped,
            duplicate_rows_dropped: normalized.stats.duplicate_rows_dropped,
            normalized_rows: normalized.len(),
            resampled_rows: resampled.len(),
            columns: resampled.columns.len(),
            period_micros,
            frequency_hz: frequency_hz(period_micros),
            period_policy: options.period_policy.name().to_string(),
            collisions,
            output_file,
            finished_at: Utc::now(),
            elapsed_secs,
        })
    }
}
