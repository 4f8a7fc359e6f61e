use thiserror::Error;

use crate::stats::StatsError;

/// Configuration problems. Always fatal, raised before any computation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No event log configured (pass --events or set WP_EVENTS_PATH)")]
    MissingEventsPath,

    #[error("Invalid horizon label: {0}")]
    InvalidHorizon(String),

    #[error("Invalid window bound: {0} (expected 'inclusive' or 'exclusive')")]
    InvalidWindowBound(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Compared horizon {0} is not among the computed horizons")]
    UnknownComparedHorizon(String),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("Statistical test failed for {condition}: {source}")]
    Stats {
        condition: String,
        #[source]
        source: StatsError,
    },

    #[error("Checksum mismatch for {file}: expected {expected}, found {found}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        found: String,
    },
}

impl AnalysisError {
    /// Configuration failures abort the run before any table is produced.
    pub fn is_config(&self) -> bool {
        matches!(self, AnalysisError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
