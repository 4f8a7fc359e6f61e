//! # Report Writers
//!
//! Serializes an [`AnalysisReport`] into the two result tables plus a JSON
//! run summary:
//!
//! - rate table: `team_id, exclusion_success_rate, success_rate_general,
//!   success_rate_<h>..., diff_<h>...` (empty cell = undefined)
//! - test table: `Test, Condition, Statistic, p-value` (4 / 6 decimals)
//! - summary: counts, excluded teams, SHA256 checksum of both tables
//!
//! Tables are rendered fully in memory first so the checksum covers exactly
//! the bytes written. Nothing time-dependent goes into any output, so an
//! unchanged input reproduces identical files.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;

use crate::config::OutputConfig;
use crate::error::{AnalysisError, Result};
use crate::horizon::Horizon;
use crate::pipeline::{AnalysisReport, TestResult};
use crate::rates::TeamRates;
use crate::stats::round_to;

pub const STATISTIC_DECIMALS: i32 = 4;
pub const P_VALUE_DECIMALS: i32 = 6;

#[derive(Debug, Serialize)]
struct TestRecord<'a> {
    #[serde(rename = "Test")]
    test: &'a str,
    #[serde(rename = "Condition")]
    condition: &'a str,
    #[serde(rename = "Statistic")]
    statistic: String,
    #[serde(rename = "p-value")]
    p_value: String,
}

/// Checksum record for one written table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChecksum {
    pub file: String,
    /// SHA256 (hex)
    pub sha256: String,
    pub bytes: u64,
}

/// Metadata written next to the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub crate_version: String,
    pub event_count: usize,
    pub match_count: usize,
    pub team_count: usize,
    pub horizons: Vec<String>,
    pub excluded_teams: Vec<i64>,
    pub test_rows: usize,
    pub outputs: Vec<FileChecksum>,
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Header of the rate table for the given horizons.
pub fn rate_table_header(horizons: &[Horizon]) -> Vec<String> {
    let mut header = vec![
        "team_id".to_string(),
        "exclusion_success_rate".to_string(),
        "success_rate_general".to_string(),
    ];
    header.extend(horizons.iter().map(|h| format!("success_rate_{}", h.label())));
    header.extend(horizons.iter().map(|h| format!("diff_{}", h.label())));
    header
}

/// Write the per-team rate table.
pub fn write_rate_table<W: Write>(writer: W, rates: &[TeamRates], horizons: &[Horizon]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(rate_table_header(horizons))?;

    for team in rates {
        let mut record = vec![
            team.team.to_string(),
            cell(team.exclusion_success_rate.value()),
            cell(team.success_rate_general.value()),
        ];
        record.extend(horizons.iter().map(|h| cell(team.horizons.get(h).copied())));
        record.extend(horizons.iter().map(|&h| cell(team.diff(h))));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write the statistical test table.
pub fn write_test_table<W: Write>(writer: W, tests: &[TestResult]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for result in tests {
        csv.serialize(TestRecord {
            test: result.test,
            condition: &result.condition,
            statistic: round_to(result.outcome.statistic, STATISTIC_DECIMALS).to_string(),
            p_value: round_to(result.outcome.p_value, P_VALUE_DECIMALS).to_string(),
        })?;
    }
    if tests.is_empty() {
        csv.write_record(["Test", "Condition", "Statistic", "p-value"])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn write_checked(output: &OutputConfig, name: &str, bytes: &[u8]) -> Result<FileChecksum> {
    let path = output.dir.join(name);
    fs::write(&path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "table written");
    Ok(FileChecksum {
        file: name.to_string(),
        sha256: checksum(bytes),
        bytes: bytes.len() as u64,
    })
}

/// Write both tables and the summary into `output.dir`.
pub fn write_outputs(report: &AnalysisReport, output: &OutputConfig) -> Result<RunSummary> {
    fs::create_dir_all(&output.dir)?;

    let mut rates_bytes = Vec::new();
    write_rate_table(&mut rates_bytes, &report.team_rates, &report.horizons)?;
    let mut tests_bytes = Vec::new();
    write_test_table(&mut tests_bytes, &report.tests)?;

    let outputs = vec![
        write_checked(output, &output.rates_file, &rates_bytes)?,
        write_checked(output, &output.tests_file, &tests_bytes)?,
    ];

    let summary = RunSummary {
        crate_version: crate::VERSION.to_string(),
        event_count: report.event_count,
        match_count: report.match_count,
        team_count: report.team_rates.len(),
        horizons: report.horizons.iter().map(Horizon::label).collect(),
        excluded_teams: report.excluded_teams.iter().map(|t| t.0).collect(),
        test_rows: report.tests.len(),
        outputs,
    };

    let json = serde_json::to_string_pretty(&summary)?;
    fs::write(output.summary_path(), json)?;
    Ok(summary)
}

/// Recompute the checksums of the tables listed in the summary.
pub fn verify_outputs(output: &OutputConfig) -> Result<RunSummary> {
    let json = fs::read_to_string(output.summary_path())?;
    let summary: RunSummary = serde_json::from_str(&json)?;

    for entry in &summary.outputs {
        let bytes = fs::read(output.dir.join(&entry.file))?;
        let found = checksum(&bytes);
        if found != entry.sha256 {
            return Err(AnalysisError::ChecksumMismatch {
                file: entry.file.clone(),
                expected: entry.sha256.clone(),
                found,
            });
        }
    }
    Ok(summary)
}
