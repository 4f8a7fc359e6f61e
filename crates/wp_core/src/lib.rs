//! # wp_core - Exclusion & Timeout Impact Analysis
//!
//! Measures how exclusions and timeouts change a water-polo team's scoring
//! success over the following possession or the following minutes.
//!
//! ## Pipeline
//! - `loader` - CSV export of the event table → [`EventLog`]
//! - `segment` - trigger-relative blocks (prefix scan, deduplicated)
//! - `rates` - exclusion / general / timeout-conditioned success rates
//! - `stats` - paired t, Wilcoxon, Pearson, Spearman
//! - `pipeline` - configuration-driven run producing an [`AnalysisReport`]
//! - `report` - rate and test tables, run summary with checksums
//!
//! Everything runs single-threaded over one immutable snapshot; the same
//! input always produces the same tables.

pub mod config;
pub mod error;
pub mod horizon;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod rates;
pub mod report;
pub mod segment;
pub mod stats;

pub use config::{AnalysisConfig, OutputConfig};
pub use error::{AnalysisError, ConfigError, Result};
pub use horizon::Horizon;
pub use loader::{load_events, load_events_from_reader};
pub use model::{Event, EventKind, EventLog, MatchId, TeamId};
pub use pipeline::{run_analysis, AnalysisReport, TestResult};
pub use rates::{Rate, RateCalculator, TeamRates};
pub use report::{verify_outputs, write_outputs, RunSummary};
pub use segment::{segment, take_while_from, BlockSet, ContinuationRule, Trigger, WindowBound};
pub use stats::{StatTest, StatsError, TestOutcome};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
