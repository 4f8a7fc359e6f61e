//! # Analysis Configuration
//!
//! Which horizons to compute, which to compare, where the log lives and where
//! the tables go.
//!
//! Layering (later wins): defaults → YAML file → environment (`.env` is read
//! first) → command line.
//!
//! ```rust
//! use wp_core::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::default();
//! assert_eq!(config.horizons.len(), 4);
//! assert_eq!(config.compared_horizons.len(), 3);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::horizon::Horizon;
use crate::segment::WindowBound;

pub const ENV_EVENTS_PATH: &str = "WP_EVENTS_PATH";
pub const ENV_OUTPUT_DIR: &str = "WP_OUTPUT_DIR";
pub const ENV_HORIZONS: &str = "WP_HORIZONS";
pub const ENV_COMPARED_HORIZONS: &str = "WP_COMPARED_HORIZONS";
pub const ENV_WINDOW_BOUND: &str = "WP_WINDOW_BOUND";

/// Output file names inside the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub rates_file: String,
    pub tests_file: String,
    pub summary_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            rates_file: "success_rates.csv".to_string(),
            tests_file: "statistical_tests.csv".to_string(),
            summary_file: "summary.json".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn rates_path(&self) -> PathBuf {
        self.dir.join(&self.rates_file)
    }

    pub fn tests_path(&self) -> PathBuf {
        self.dir.join(&self.tests_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(&self.summary_file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// CSV export of the event table
    pub events_path: Option<PathBuf>,
    /// Horizons written to the rate table
    pub horizons: Vec<Horizon>,
    /// Horizons run through the comparative tests
    pub compared_horizons: Vec<Horizon>,
    /// Whether a row exactly at the window edge is included
    pub window_bound: WindowBound,
    /// Restrict the analysis to these teams (all teams when empty)
    pub teams: Vec<i64>,
    pub output: OutputConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            events_path: None,
            horizons: vec![
                Horizon::Immediate,
                Horizon::minutes(2),
                Horizon::minutes(4),
                Horizon::minutes(5),
            ],
            compared_horizons: vec![Horizon::minutes(2), Horizon::minutes(4), Horizon::Immediate],
            window_bound: WindowBound::Inclusive,
            teams: Vec::new(),
            output: OutputConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Every standard window (2, 3, 4, 5 minutes) plus immediate, all compared.
    pub fn exhaustive() -> Self {
        let horizons = vec![
            Horizon::Immediate,
            Horizon::minutes(2),
            Horizon::minutes(3),
            Horizon::minutes(4),
            Horizon::minutes(5),
        ];
        Self {
            compared_horizons: horizons.clone(),
            horizons,
            ..Self::default()
        }
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `WP_*` variables from the process environment, reading `.env` first.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_EVENTS_PATH).filter(|v| !v.is_empty()) {
            self.events_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(list) = lookup(ENV_HORIZONS) {
            self.horizons = parse_horizon_list(&list)?;
        }
        if let Some(list) = lookup(ENV_COMPARED_HORIZONS) {
            self.compared_horizons = parse_horizon_list(&list)?;
        }
        if let Some(bound) = lookup(ENV_WINDOW_BOUND) {
            self.window_bound = bound.parse()?;
        }
        Ok(self)
    }

    /// The event log location; a missing path is a fatal configuration error.
    pub fn require_events_path(&self) -> Result<&Path, ConfigError> {
        self.events_path
            .as_deref()
            .ok_or(ConfigError::MissingEventsPath)
    }

    /// Every compared horizon must also be computed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for h in &self.compared_horizons {
            if !self.horizons.contains(h) {
                return Err(ConfigError::UnknownComparedHorizon(h.label()));
            }
        }
        Ok(())
    }

    /// Print the effective configuration through `tracing`.
    pub fn log_effective(&self) {
        let labels = |hs: &[Horizon]| hs.iter().map(Horizon::label).collect::<Vec<_>>().join(",");
        tracing::info!(
            events = ?self.events_path,
            output_dir = %self.output.dir.display(),
            horizons = %labels(&self.horizons),
            compared = %labels(&self.compared_horizons),
            window_bound = ?self.window_bound,
            "analysis configuration"
        );
    }
}

/// Comma separated horizon labels, e.g. `immediate,2min,4min`.
pub fn parse_horizon_list(list: &str) -> Result<Vec<Horizon>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AnalysisConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.window_bound, WindowBound::Inclusive);
        assert_eq!(cfg.output.rates_path(), PathBuf::from("./success_rates.csv"));
    }

    #[test]
    fn test_exhaustive_compares_everything() {
        let cfg = AnalysisConfig::exhaustive();
        assert_eq!(cfg.horizons, cfg.compared_horizons);
        assert!(cfg.horizons.contains(&Horizon::minutes(3)));
    }

    #[test]
    fn test_missing_events_path_is_fatal() {
        let cfg = AnalysisConfig::default();
        assert!(matches!(
            cfg.require_events_path(),
            Err(ConfigError::MissingEventsPath)
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_EVENTS_PATH, "data/events.csv"),
            (ENV_OUTPUT_DIR, "out"),
            (ENV_HORIZONS, "immediate, 3min"),
            (ENV_COMPARED_HORIZONS, "3min"),
            (ENV_WINDOW_BOUND, "exclusive"),
        ]);
        let cfg = AnalysisConfig::default()
            .with_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(cfg.require_events_path().unwrap(), Path::new("data/events.csv"));
        assert_eq!(cfg.output.dir, PathBuf::from("out"));
        assert_eq!(cfg.horizons, vec![Horizon::Immediate, Horizon::minutes(3)]);
        assert_eq!(cfg.compared_horizons, vec![Horizon::minutes(3)]);
        assert_eq!(cfg.window_bound, WindowBound::Exclusive);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let result = AnalysisConfig::default()
            .with_overrides_from(|k| (k == ENV_HORIZONS).then(|| "2min,later".to_string()));
        assert!(matches!(result, Err(ConfigError::InvalidHorizon(_))));
    }

    #[test]
    fn test_compared_horizon_must_be_computed() {
        let cfg = AnalysisConfig {
            horizons: vec![Horizon::Immediate],
            compared_horizons: vec![Horizon::minutes(2)],
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnknownComparedHorizon(label)) if label == "2mins"
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "events_path: events.csv\nhorizons: [immediate, 2min]\ncompared_horizons: [2mins]\nwindow_bound: exclusive\noutput:\n  dir: reports"
        )
        .unwrap();

        let cfg = AnalysisConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(cfg.horizons, vec![Horizon::Immediate, Horizon::minutes(2)]);
        assert_eq!(cfg.window_bound, WindowBound::Exclusive);
        assert_eq!(cfg.output.dir, PathBuf::from("reports"));
        // unspecified fields keep their defaults
        assert_eq!(cfg.output.tests_file, "statistical_tests.csv");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_yaml_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "horizons: [sometime]").unwrap();
        let err = AnalysisConfig::from_yaml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }
}
