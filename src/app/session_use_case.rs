use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::app::ports::{LogDecoderPort, PlotGeneratorPort};
use crate::config::Config;
use crate::error::{AlignError, Result};
use crate::observability::metrics;
use crate::pipeline::{Pipeline, PipelineOptions, PipelineResult};

/// Per-run switches for the session driver.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Rebuild the combined output even when one already exists.
    pub force_rebuild: bool,
    /// Assume the topic CSVs are already present and skip the decoder.
    pub skip_decode: bool,
    pub data_dir_name: String,
    pub plots_dir_name: String,
    pub log_extension: String,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            force_rebuild: false,
            skip_decode: false,
            data_dir_name: config.session.data_dir_name.clone(),
            plots_dir_name: config.session.plots_dir_name.clone(),
            log_extension: config.session.log_extension.clone(),
        }
    }
}

/// Directory layout of one session under the run root.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLayout {
    /// Log file stem; also the output file suffix.
    pub name: String,
    pub session_dir: PathBuf,
    pub data_dir: PathBuf,
    pub plots_dir: PathBuf,
    /// The raw log's copy inside `data_dir`.
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Rebuilt(PipelineResult),
    Reused { session: String, output_file: PathBuf },
}

impl SessionOutcome {
    pub fn output_file(&self) -> &Path {
        match self {
            SessionOutcome::Rebuilt(result) => &result.output_file,
            SessionOutcome::Reused { output_file, .. } => output_file,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionFailure {
    pub session: String,
    pub stage: &'static str,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<SessionOutcome>,
    pub failures: Vec<SessionFailure>,
}

/// Drives every session under a root directory: layout, decode, combine, plot.
pub struct SessionUseCase {
    decoder: Arc<dyn LogDecoderPort>,
    plotter: Option<Arc<dyn PlotGeneratorPort>>,
    pipeline: PipelineOptions,
    options: SessionOptions,
}

impl SessionUseCase {
    pub fn new(
        decoder: Arc<dyn LogDecoderPort>,
        plotter: Option<Arc<dyn PlotGeneratorPort>>,
        pipeline: PipelineOptions,
        options: SessionOptions,
    ) -> Self {
        Self {
            decoder,
            plotter,
            pipeline,
            options,
        }
    }

    /// Raw logs directly inside `root`, sorted by name.
    pub fn discover_logs(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(root).map_err(|e| layout_error(root, e))?;
        let mut logs = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| layout_error(root, e))?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case(&self.options.log_extension))
                .unwrap_or(false);
            if matches && path.is_file() {
                logs.push(path);
            }
        }
        logs.sort();
        Ok(logs)
    }

    /// Create `<root>/<stem>/{data,plots}` and place a copy of the log in the
    /// data directory. An existing copy is left untouched.
    pub fn prepare_layout(&self, log_file: &Path) -> Result<SessionLayout> {
        let root = log_file.parent().unwrap_or(Path::new("."));
        let name = log_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| AlignError::Decoder(format!("no file name in {}", log_file.display())))?;
        let file_name = log_file.file_name().unwrap_or_default();

        let session_dir = root.join(&name);
        let data_dir = session_dir.join(&self.options.data_dir_name);
        let plots_dir = session_dir.join(&self.options.plots_dir_name);
        for dir in [&session_dir, &data_dir, &plots_dir] {
            fs::create_dir_all(dir).map_err(|e| layout_error(dir, e))?;
        }

        let log_path = data_dir.join(file_name);
        if !log_path.exists() {
            fs::copy(log_file, &log_path).map_err(|e| layout_error(&log_path, e))?;
        }

        Ok(SessionLayout {
            name,
            session_dir,
            data_dir,
            plots_dir,
            log_path,
        })
    }

    /// Decode (unless skipped or reusing) then combine and plot one session.
    #[instrument(skip(self, layout), fields(session = %layout.name))]
    pub async fn run_session(&self, layout: &SessionLayout) -> Result<SessionOutcome> {
        if !self.reusable(&layout.data_dir, &layout.name) && !self.options.skip_decode {
            info!(log = %layout.log_path.display(), "Decoding raw log");
            self.decoder.decode(&layout.log_path, &layout.data_dir).await?;
        }
        self.combine_directory(&layout.data_dir, &layout.name, Some(&layout.plots_dir))
            .await
    }

    /// Combine an already decoded directory, then plot into `plots_dir` if given.
    pub async fn combine_directory(
        &self,
        input_dir: &Path,
        file_suffix: &str,
        plots_dir: Option<&Path>,
    ) -> Result<SessionOutcome> {
        let started = Instant::now();
        let outcome = if self.reusable(input_dir, file_suffix) {
            let output_file = self.pipeline.output_path(input_dir, file_suffix);
            info!(output = %output_file.display(), "Output exists; skipping rebuild");
            metrics::session::reused();
            SessionOutcome::Reused {
                session: file_suffix.to_string(),
                output_file,
            }
        } else {
            let dir = input_dir.to_path_buf();
            let suffix = file_suffix.to_string();
            let options = self.pipeline.clone();
            let result = tokio::task::spawn_blocking(move || {
                Pipeline::run_session_core(&dir, &suffix, &options)
            })
            .await
            .map_err(|e| AlignError::Task(e.to_string()))??;
            metrics::session::succeeded(started.elapsed().as_secs_f64());
            SessionOutcome::Rebuilt(result)
        };

        if let (Some(plotter), Some(plots_dir)) = (&self.plotter, plots_dir) {
            if let Err(e) = plotter.generate(outcome.output_file(), plots_dir).await {
                warn!(error = %e, "Plot generation failed; combined output is kept");
            }
        }
        Ok(outcome)
    }

    /// Run every session under `root`. A failed session is recorded and the
    /// rest continue; a configuration error stops the run.
    pub async fn run_all(&self, root: &Path) -> Result<RunReport> {
        self.run_all_with(root, |_| {}).await
    }

    /// Like [`run_all`](Self::run_all), calling `on_outcome` as soon as each
    /// session finishes.
    pub async fn run_all_with<F>(&self, root: &Path, mut on_outcome: F) -> Result<RunReport>
    where
        F: FnMut(&SessionOutcome),
    {
        let mut report = RunReport::default();
        for log_file in self.discover_logs(root)? {
            let session = log_file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!(session = %session, "Working on session");

            let result = match self.prepare_layout(&log_file) {
                Ok(layout) => self.run_session(&layout).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(outcome) => {
                    info!(
                        session = %session,
                        output = %outcome.output_file().display(),
                        "Session finished"
                    );
                    on_outcome(&outcome);
                    report.outcomes.push(outcome);
                }
                Err(e) if e.is_fatal_for_run() => return Err(e),
                Err(e) => {
                    let stage = e.stage();
                    error!(session = %session, stage, error = %e, "Session failed");
                    metrics::session::failed(stage);
                    report.failures.push(SessionFailure {
                        session,
                        stage,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    fn reusable(&self, input_dir: &Path, file_suffix: &str) -> bool {
        !self.options.force_rebuild && self.pipeline.output_path(input_dir, file_suffix).is_file()
    }
}

fn layout_error(path: &Path, e: std::io::Error) -> AlignError {
    AlignError::Decoder(format!("session layout at {}: {}", path.display(), e))
}
