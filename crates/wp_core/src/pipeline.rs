//! # Analysis Pipeline
//!
//! One configuration-driven pass over an [`EventLog`]:
//! 1. per-team exclusion, general and timeout-conditioned rates
//! 2. paired vectors (general vs. each compared horizon) over the teams
//!    whose general rate is defined
//! 3. every [`StatTest`] on every compared horizon
//!
//! The result only depends on the log and the configuration; teams are
//! always reported in ascending id order.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::horizon::Horizon;
use crate::model::{EventLog, TeamId};
use crate::rates::{RateCalculator, TeamRates};
use crate::stats::{StatTest, TestOutcome};

/// One row of the statistical test table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub test: &'static str,
    pub condition: String,
    pub outcome: TestOutcome,
}

/// Per-team vectors aligned by team id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairedSamples {
    pub teams: Vec<TeamId>,
    pub general: Vec<f64>,
    pub horizon: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub event_count: usize,
    pub match_count: usize,
    pub horizons: Vec<Horizon>,
    /// Ascending by team id
    pub team_rates: Vec<TeamRates>,
    /// Teams left out of the paired tests because their general rate is undefined
    pub excluded_teams: Vec<TeamId>,
    pub tests: Vec<TestResult>,
}

/// Teams to analyse: every team in the log, or the configured subset.
pub fn select_teams(log: &EventLog, config: &AnalysisConfig) -> BTreeSet<TeamId> {
    let all = log.teams();
    if config.teams.is_empty() {
        return all;
    }
    config
        .teams
        .iter()
        .map(|&id| TeamId(id))
        .filter(|team| {
            let present = all.contains(team);
            if !present {
                tracing::warn!(team = %team, "configured team has no events");
            }
            present
        })
        .collect()
}

/// Build the paired vectors for one horizon, skipping undefined general rates.
pub fn paired_samples(rates: &[TeamRates], horizon: Horizon) -> PairedSamples {
    let mut samples = PairedSamples::default();
    for team in rates {
        let (Some(general), Some(&conditioned)) =
            (team.success_rate_general.value(), team.horizons.get(&horizon))
        else {
            continue;
        };
        samples.teams.push(team.team);
        samples.general.push(general);
        samples.horizon.push(conditioned);
    }
    samples
}

/// Run every test on every compared horizon, test-major order.
pub fn compare_horizons(rates: &[TeamRates], compared: &[Horizon]) -> Result<Vec<TestResult>> {
    let mut results = Vec::with_capacity(StatTest::ALL.len() * compared.len());
    for test in StatTest::ALL {
        for &horizon in compared {
            let samples = paired_samples(rates, horizon);
            let outcome = test
                .run(&samples.horizon, &samples.general)
                .map_err(|source| AnalysisError::Stats {
                    condition: format!("{} ({})", test.name(), horizon.label()),
                    source,
                })?;
            results.push(TestResult {
                test: test.name(),
                condition: horizon.label(),
                outcome,
            });
        }
    }
    Ok(results)
}

/// Full analysis of one event log.
pub fn run_analysis(log: &EventLog, config: &AnalysisConfig) -> Result<AnalysisReport> {
    config.validate()?;

    let teams = select_teams(log, config);
    tracing::info!(
        events = log.len(),
        matches = log.match_count(),
        teams = teams.len(),
        "computing success rates"
    );

    let calculator = RateCalculator::new(log, config.window_bound);
    let team_rates: Vec<TeamRates> = teams
        .iter()
        .map(|&team| calculator.team_rates(team, &config.horizons))
        .collect();

    let excluded_teams: Vec<TeamId> = team_rates
        .iter()
        .filter(|r| !r.success_rate_general.is_defined())
        .map(|r| r.team)
        .collect();
    if !excluded_teams.is_empty() {
        tracing::warn!(
            count = excluded_teams.len(),
            teams = ?excluded_teams,
            "general success rate undefined; teams left out of paired tests"
        );
    }

    tracing::info!(
        horizons = config.compared_horizons.len(),
        "running comparative statistics"
    );
    let tests = compare_horizons(&team_rates, &config.compared_horizons)?;

    Ok(AnalysisReport {
        event_count: log.len(),
        match_count: log.match_count(),
        horizons: config.horizons.clone(),
        team_rates,
        excluded_teams,
        tests,
    })
}
