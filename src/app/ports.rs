use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Converts one raw binary log into per-topic CSV files.
#[async_trait]
pub trait LogDecoderPort: Send + Sync {
    /// Decode `log_path`, writing the topic files (and any side files) into `work_dir`.
    async fn decode(&self, log_path: &Path, work_dir: &Path) -> Result<()>;
}

/// Renders plots from a session's combined output.
#[async_trait]
pub trait PlotGeneratorPort: Send + Sync {
    async fn generate(&self, combined_csv: &Path, plots_dir: &Path) -> Result<()>;
}
