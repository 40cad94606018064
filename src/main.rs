use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use flight_aligner::app::ports::PlotGeneratorPort;
use flight_aligner::app::session_use_case::{RunReport, SessionOptions, SessionOutcome, SessionUseCase};
use flight_aligner::config::Config;
use flight_aligner::constants::frequency_hz;
use flight_aligner::infra::{CommandPlotGenerator, UlogCommandDecoder};
use flight_aligner::logging;
use flight_aligner::pipeline::processing::namespace::run_identifier;
use flight_aligner::pipeline::processing::resample::PeriodPolicyKind;
use flight_aligner::pipeline::PipelineOptions;

#[derive(Parser)]
#[command(name = "flight_aligner")]
#[command(about = "Merge per-topic flight log CSVs into one resampled table")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// TOML config file; defaults apply when it does not exist
    #[arg(long, global = true, default_value = "aligner.toml")]
    config: PathBuf,

    /// Resample period in microseconds (4000 = 250 Hz)
    #[arg(long, global = true)]
    period_micros: Option<i64>,

    /// How the resample period is chosen
    #[arg(long, global = true, value_enum)]
    policy: Option<PeriodPolicyKind>,

    /// Source id substring to exclude (repeatable, replaces the configured list)
    #[arg(long, global = true)]
    exclude: Vec<String>,

    /// Rebuild combined outputs even if they already exist
    #[arg(long, global = true)]
    force_rebuild: bool,

    /// Do not run the plot generator
    #[arg(long, global = true)]
    no_plots: bool,

    /// Write the run summary as JSON to this path
    #[arg(long, global = true)]
    summary_json: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode, combine and plot every raw log in a directory
    Process {
        /// Directory holding the raw logs
        root: PathBuf,
        /// Reuse topic CSVs from an earlier decode
        #[arg(long)]
        skip_decode: bool,
    },
    /// Combine one directory of already decoded topic CSVs
    Combine {
        /// Directory holding the topic CSVs
        input_dir: PathBuf,
        /// Output file suffix; defaults to the run identifier
        #[arg(long)]
        suffix: Option<String>,
    },
}

fn apply_overrides(config: &mut Config, args: &GlobalArgs) {
    if let Some(period) = args.period_micros {
        config.resample.period_micros = period;
    }
    if let Some(policy) = args.policy {
        config.resample.policy = policy;
    }
    if !args.exclude.is_empty() {
        config.merge.exclude = args.exclude.clone();
    }
}

fn report_outcome(outcome: &SessionOutcome) {
    match outcome {
        SessionOutcome::Rebuilt(result) => {
            println!("Resampling complete.");
            println!(
                "Sample period is:\t{} us\nThe corresponding frequency is:\t{} Hz\nOutput saved to:  {}",
                result.period_micros,
                result.frequency_hz,
                result.output_file.display()
            );
            println!(
                "   Sources: {} loaded, {} excluded | rows: {} merged, {} normalized, {} resampled",
                result.sources_loaded,
                result.sources_excluded.len(),
                result.merged_rows,
                result.normalized_rows,
                result.resampled_rows
            );
            for (column, sources) in &result.collisions {
                println!("   Column collision: {} <- {}", column, sources.join(", "));
            }
        }
        SessionOutcome::Reused { output_file, .. } => {
            println!("Existing output reused: {}", output_file.display());
        }
    }
}

fn write_summary(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("writing summary to {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.global.config)?;
    apply_overrides(&mut config, &cli.global);
    let _log_guard = logging::init_logging(&config.logging.dir);
    // Bad configuration fails every session, so stop before doing any work
    config.validate()?;
    info!(
        period_micros = config.resample.period_micros,
        frequency_hz = frequency_hz(config.resample.period_micros),
        policy = ?config.resample.policy,
        "Configuration loaded"
    );

    let plotter: Option<Arc<dyn PlotGeneratorPort>> = match (&config.plot.program, cli.global.no_plots) {
        (Some(program), false) => {
            Some(Arc::new(CommandPlotGenerator::new(program.clone())) as Arc<dyn PlotGeneratorPort>)
        }
        _ => None,
    };
    let mut session_options = SessionOptions::from_config(&config);
    session_options.force_rebuild = cli.global.force_rebuild;

    let report = match cli.command {
        Commands::Process { root, skip_decode } => {
            session_options.skip_decode = skip_decode;
            let root = root
                .canonicalize()
                .with_context(|| format!("input directory {}", root.display()))?;
            let use_case = SessionUseCase::new(
                Arc::new(UlogCommandDecoder::new(config.decoder.clone())),
                plotter,
                PipelineOptions::from_config(&config),
                session_options,
            );
            let report = use_case.run_all_with(&root, report_outcome).await?;
            for failure in &report.failures {
                println!("Session {} failed at {}: {}", failure.session, failure.stage, failure.message);
            }
            println!("Complete.");
            report
        }
        Commands::Combine { input_dir, suffix } => {
            let input_dir = input_dir
                .canonicalize()
                .with_context(|| format!("input directory {}", input_dir.display()))?;
            let suffix = suffix.unwrap_or_else(|| run_identifier(&input_dir));
            let plots_dir = input_dir
                .parent()
                .map(|p| p.join(&config.session.plots_dir_name))
                .filter(|p| p.is_dir());
            let use_case = SessionUseCase::new(
                Arc::new(UlogCommandDecoder::new(config.decoder.clone())),
                plotter,
                PipelineOptions::from_config(&config),
                session_options,
            );
            let mut report = RunReport::default();
            match use_case.combine_directory(&input_dir, &suffix, plots_dir.as_deref()).await {
                Ok(outcome) => {
                    report_outcome(&outcome);
                    report.outcomes.push(outcome);
                }
                Err(e) => {
                    error!(stage = e.stage(), error = %e, "Combine failed");
                    return Err(anyhow::Error::new(e).context(format!("combining {}", input_dir.display())));
                }
            }
            report
        }
    };

    if let Some(path) = &cli.global.summary_json {
        write_summary(path, &report)?;
    }
    Ok(())
}
