use crate::app::ports::PlotGeneratorPort;
use crate::error::{AlignError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Runs `<program> <combined.csv> <plots dir>`.
pub struct CommandPlotGenerator {
    program: String,
}

impl CommandPlotGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl PlotGeneratorPort for CommandPlotGenerator {
    async fn generate(&self, combined_csv: &Path, plots_dir: &Path) -> Result<()> {
        info!(program = %self.program, input = %combined_csv.display(), "Generating plots");
        let status = Command::new(&self.program)
            .arg(combined_csv)
            .arg(plots_dir)
            .status()
            .await
            .map_err(|e| AlignError::Task(format!("failed to start {}: {e}", self.program)))?;
        if !status.success() {
            return Err(AlignError::Task(format!("{} exited with {status}", self.program)));
        }
        Ok(())
    }
}
