use crate::constants;
use crate::error::{AlignError, Result};
use crate::pipeline::processing::resample::{validate_period, PeriodPolicyKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub resample: ResampleConfig,
    pub merge: MergeConfig,
    pub output: OutputConfig,
    pub session: SessionConfig,
    pub decoder: DecoderConfig,
    pub plot: PlotConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResampleConfig {
    pub period_micros: i64,
    pub policy: PeriodPolicyKind,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            period_micros: constants::DEFAULT_PERIOD_MICROS,
            policy: PeriodPolicyKind::Fixed,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeConfig {
    /// Substrings of source ids to leave out of the merge.
    pub exclude: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            exclude: constants::default_excludes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub dir_name: String,
    pub suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir_name: constants::DEFAULT_OUTPUT_DIR.to_string(),
            suffix: constants::DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub data_dir_name: String,
    pub plots_dir_name: String,
    pub log_extension: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            data_dir_name: constants::DEFAULT_DATA_DIR.to_string(),
            plots_dir_name: constants::DEFAULT_PLOTS_DIR.to_string(),
            log_extension: constants::DEFAULT_LOG_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    pub program: String,
    pub info_program: String,
    pub params_program: String,
    pub messages_program: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: constants::DEFAULT_DECODER.to_string(),
            info_program: constants::DEFAULT_INFO_PROGRAM.to_string(),
            params_program: constants::DEFAULT_PARAMS_PROGRAM.to_string(),
            messages_program: constants::DEFAULT_MESSAGES_PROGRAM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotConfig {
    /// Program run with `<output.csv> <plots dir>`; plotting is off when unset.
    pub program: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(constants::DEFAULT_LOG_DIR),
        }
    }
}

impl Config {
    /// Read `path` as TOML. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            AlignError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject settings that would fail every session.
    pub fn validate(&self) -> Result<()> {
        validate_period(self.resample.period_micros)?;
        if self.output.dir_name.is_empty() {
            return Err(AlignError::Config("output.dir_name must not be empty".into()));
        }
        if self.output.dir_name.contains(['/', '\\']) {
            return Err(AlignError::Config(
                "output.dir_name must be a single directory name".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.resample.period_micros, 4000);
        assert_eq!(config.resample.policy, PeriodPolicyKind::Fixed);
        assert_eq!(config.merge.exclude.len(), 5);
        assert_eq!(config.output.dir_name, "combined");
        assert_eq!(config.output.suffix, "_combined");
        assert!(config.plot.program.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [resample]
            period_micros = 10000
            policy = "min_gap"

            [merge]
            exclude = ["telemetry"]
            "#,
        )
        .unwrap();
        assert_eq!(config.resample.period_micros, 10000);
        assert_eq!(config.resample.policy, PeriodPolicyKind::MinGap);
        assert_eq!(config.merge.exclude, vec!["telemetry"]);
        assert_eq!(config.decoder.program, "ulog2csv");
    }

    #[test]
    fn test_validate_rejects_non_positive_period() {
        let mut config = Config::default();
        config.resample.period_micros = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AlignError::InvalidPeriod(0)));
        assert!(err.is_fatal_for_run());
    }

    #[test]
    fn test_validate_rejects_nested_output_dir() {
        let mut config = Config::default();
        config.output.dir_name = "a/b".into();
        assert!(matches!(config.validate(), Err(AlignError::Config(_))));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(matches!(
            Config::from_toml("resample = 3"),
            Err(AlignError::Toml(_))
        ));
    }
}
