use crate::app::ports::LogDecoderPort;
use crate::config::DecoderConfig;
use crate::error::{AlignError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs the pyulog command line tools as child processes.
///
/// `ulog2csv` must succeed; the info/params/messages dumps are side files
/// and only warn on failure.
pub struct UlogCommandDecoder {
    config: DecoderConfig,
}

impl UlogCommandDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    async fn dump_side_file(&self, program: &str, args: &[&str], log_path: &Path, target: &Path) {
        let output = Command::new(program)
            .args(args)
            .arg(log_path)
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                if let Err(e) = tokio::fs::write(target, &out.stdout).await {
                    warn!(path = %target.display(), error = %e, "Failed to write side file");
                } else {
                    debug!(path = %target.display(), "Wrote side file");
                }
            }
            Ok(out) => {
                warn!(program, status = %out.status, "Side file program failed");
            }
            Err(e) => {
                warn!(program, error = %e, "Side file program could not be started");
            }
        }
    }
}

#[async_trait]
impl LogDecoderPort for UlogCommandDecoder {
    async fn decode(&self, log_path: &Path, work_dir: &Path) -> Result<()> {
        let program = &self.config.program;
        info!(program = %program, log = %log_path.display(), "Running decoder");
        let status = Command::new(program)
            .arg("-o")
            .arg(work_dir)
            .arg(log_path)
            .current_dir(work_dir)
            .status()
            .await
            .map_err(|e| AlignError::Decoder(format!("failed to start {program}: {e}")))?;
        if !status.success() {
            return Err(AlignError::Decoder(format!(
                "{program} exited with {status} for {}",
                log_path.display()
            )));
        }

        let stem = log_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let side_files: [(&str, &[&str], &str); 3] = [
            (self.config.info_program.as_str(), &[], "info"),
            (self.config.params_program.as_str(), &["-i"], "params"),
            (self.config.messages_program.as_str(), &[], "messages"),
        ];
        for (program, args, kind) in side_files {
            let target = work_dir.join(format!("{stem}_{kind}.txt"));
            self.dump_side_file(program, args, log_path, &target).await;
        }
        Ok(())
    }
}
