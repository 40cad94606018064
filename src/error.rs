use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a session ended up with nothing to merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyInputCause {
    /// The input directory held no tabular files at all.
    NoSources,
    /// Every discovered source matched the exclusion set.
    AllExcluded,
    /// Every merged row carried the sentinel timestamp.
    AllSentinel,
}

impl fmt::Display for EmptyInputCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyInputCause::NoSources => write!(f, "no source files found"),
            EmptyInputCause::AllExcluded => write!(f, "every source was excluded"),
            EmptyInputCause::AllSentinel => {
                write!(f, "every row carried the sentinel timestamp 0")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("Parse error in {path} (line {line}): {message}")]
    Parse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("Empty input: {0}")]
    EmptyInput(EmptyInputCause),

    #[error("Invalid resample period: {0} us (must be positive)")]
    InvalidPeriod(i64),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Session task failed: {0}")]
    Task(String),
}

impl AlignError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AlignError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, line: u64, message: impl Into<String>) -> Self {
        AlignError::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Pipeline stage an error is attributed to when a session reports failure.
    pub fn stage(&self) -> &'static str {
        match self {
            AlignError::Parse { .. } => "load",
            AlignError::EmptyInput(EmptyInputCause::AllSentinel) => "normalize",
            AlignError::EmptyInput(_) => "merge",
            AlignError::InvalidPeriod(_) => "resample",
            AlignError::Io { .. } => "sink",
            AlignError::Toml(_) | AlignError::Config(_) => "config",
            AlignError::Decoder(_) => "decode",
            AlignError::Task(_) => "runtime",
        }
    }

    /// Configuration problems abort the whole run rather than one session.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            AlignError::InvalidPeriod(_) | AlignError::Config(_) | AlignError::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_attribution() {
        assert_eq!(AlignError::parse("a.csv", 2, "bad").stage(), "load");
        assert_eq!(
            AlignError::EmptyInput(EmptyInputCause::AllExcluded).stage(),
            "merge"
        );
        assert_eq!(
            AlignError::EmptyInput(EmptyInputCause::AllSentinel).stage(),
            "normalize"
        );
        assert_eq!(AlignError::InvalidPeriod(0).stage(), "resample");
    }

    #[test]
    fn test_only_configuration_errors_are_fatal_for_run() {
        assert!(AlignError::InvalidPeriod(-4).is_fatal_for_run());
        assert!(AlignError::Config("x".into()).is_fatal_for_run());
        assert!(!AlignError::EmptyInput(EmptyInputCause::NoSources).is_fatal_for_run());
        assert!(!AlignError::parse("a.csv", 1, "bad").is_fatal_for_run());
    }

    #[test]
    fn test_empty_input_message_names_cause() {
        let msg = AlignError::EmptyInput(EmptyInputCause::AllSentinel).to_string();
        assert!(msg.contains("sentinel"));
    }
}
