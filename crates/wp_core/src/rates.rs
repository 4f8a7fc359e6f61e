//! # Success Rate Calculators
//!
//! Per-team conversion rates over the whole log and over the blocks that
//! follow exclusions and timeouts.
//!
//! ## Formulas
//! - exclusion rate = goals in the team's exclusion-block rows / exclusion
//!   rows in those blocks
//! - successes = goals + exclusions × exclusion rate (an exclusion is credited
//!   with its expected conversion, not a binary outcome)
//! - attempts = possession starts (rows where `team_id` switches to the team)
//! - success rate = successes / attempts × 100
//!
//! The whole-log rates are [`Rate::Undefined`] on a zero denominator. Timeout
//! horizons fall back to 0 instead; the two cases are deliberately distinct.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::horizon::Horizon;
use crate::model::{EventLog, TeamId};
use crate::segment::{segment, BlockSet, ContinuationRule, Trigger, WindowBound};

/// A ratio that may have had a zero denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "Option<f64>")]
pub enum Rate {
    Defined(f64),
    Undefined,
}

impl Rate {
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Rate::Undefined
        } else {
            Rate::Defined(numerator / denominator)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Rate::Defined(v) => Some(*v),
            Rate::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Rate::Defined(_))
    }
}

impl From<Rate> for Option<f64> {
    fn from(rate: Rate) -> Self {
        rate.value()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rate::Defined(v) => write!(f, "{v}"),
            Rate::Undefined => f.write_str("undefined"),
        }
    }
}

/// Counts for one team over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamTally {
    /// Rows credited to the team with `shot_isGoal == true`
    pub goals: u32,
    /// Exclusion rows credited to the team
    pub exclusions: u32,
    /// Rows where the attributed team switches to this team
    pub possessions: u32,
    /// Timeout calls made by the team
    pub timeouts: u32,
}

impl TeamTally {
    /// Tally `rows` of `log` for `team`. Possession starts are judged against
    /// the previous row of the whole log, not the previous row of `rows`.
    pub fn collect<I>(log: &EventLog, rows: I, team: TeamId) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut tally = TeamTally::default();
        for row in rows {
            let Some(event) = log.get(row) else { continue };
            if event.belongs_to(team) {
                if event.is_goal() {
                    tally.goals += 1;
                }
                if event.is_exclusion() {
                    tally.exclusions += 1;
                }
            }
            if log.is_possession_start(row, team) {
                tally.possessions += 1;
            }
            if event.timeout_team_id == Some(team) {
                tally.timeouts += 1;
            }
        }
        tally
    }

    /// Goals plus expected goals from exclusions.
    ///
    /// None when the team has exclusions but no defined conversion rate.
    pub fn expected_successes(&self, exclusion_rate: Rate) -> Option<f64> {
        if self.exclusions == 0 {
            return Some(self.goals as f64);
        }
        exclusion_rate
            .value()
            .map(|rate| self.goals as f64 + self.exclusions as f64 * rate)
    }
}

/// Exclusion conversion rate of `team` over the exclusion blocks.
pub fn exclusion_success_rate(log: &EventLog, exclusion_blocks: &BlockSet, team: TeamId) -> Rate {
    let tally = TeamTally::collect(log, exclusion_blocks.rows().iter().copied(), team);
    Rate::ratio(tally.goals as f64, tally.exclusions as f64)
}

/// Success rate of `team` over the whole log, in percent.
pub fn general_success_rate(log: &EventLog, team: TeamId, exclusion_rate: Rate) -> Rate {
    let tally = TeamTally::collect(log, 0..log.len(), team);
    match tally.expected_successes(exclusion_rate) {
        Some(successes) => match Rate::ratio(successes, tally.possessions as f64) {
            Rate::Defined(v) => Rate::Defined(v * 100.0),
            Rate::Undefined => Rate::Undefined,
        },
        None => Rate::Undefined,
    }
}

/// All rates computed for one team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRates {
    pub team: TeamId,
    pub exclusion_success_rate: Rate,
    pub success_rate_general: Rate,
    /// Timeout-conditioned rate per horizon, in percent
    pub horizons: BTreeMap<Horizon, f64>,
}

impl TeamRates {
    /// `rate_<horizon> - rate_general`, None when the general rate is undefined
    /// or the horizon was not computed.
    pub fn diff(&self, horizon: Horizon) -> Option<f64> {
        let general = self.success_rate_general.value()?;
        self.horizons.get(&horizon).map(|rate| rate - general)
    }
}

/// Rate calculator bound to one event log.
///
/// The exclusion blocks and the team-continuity timeout blocks do not depend
/// on the team, so they are segmented once up front.
#[derive(Debug)]
pub struct RateCalculator<'a> {
    log: &'a EventLog,
    bound: WindowBound,
    exclusion_blocks: BlockSet,
    immediate_timeout_blocks: BlockSet,
}

impl<'a> RateCalculator<'a> {
    pub fn new(log: &'a EventLog, bound: WindowBound) -> Self {
        Self {
            log,
            bound,
            exclusion_blocks: segment(log, Trigger::Exclusion, ContinuationRule::TeamContinuity),
            immediate_timeout_blocks: segment(
                log,
                Trigger::Timeout,
                ContinuationRule::TeamContinuity,
            ),
        }
    }

    pub fn exclusion_blocks(&self) -> &BlockSet {
        &self.exclusion_blocks
    }

    pub fn exclusion_rate(&self, team: TeamId) -> Rate {
        exclusion_success_rate(self.log, &self.exclusion_blocks, team)
    }

    pub fn general_rate(&self, team: TeamId) -> Rate {
        general_success_rate(self.log, team, self.exclusion_rate(team))
    }

    /// Rows the timeout horizon looks at for `team`.
    ///
    /// `Immediate` segments every timeout and keeps the rows credited to the
    /// team afterwards; windowed horizons only segment the team's own timeout
    /// calls and keep every row of those windows. The two filter orders give
    /// different rows and are kept as they are.
    pub fn timeout_rows(&self, team: TeamId, horizon: Horizon) -> Vec<usize> {
        match horizon {
            Horizon::Immediate => self
                .immediate_timeout_blocks
                .rows()
                .iter()
                .copied()
                .filter(|&row| self.log.get(row).is_some_and(|e| e.belongs_to(team)))
                .collect(),
            Horizon::Window { .. } => segment(
                self.log,
                Trigger::TimeoutBy(team),
                ContinuationRule::for_horizon(horizon, self.bound),
            )
            .rows()
            .to_vec(),
        }
    }

    /// Timeout-conditioned success rate in percent; 0 when there are no attempts.
    pub fn timeout_rate(&self, team: TeamId, horizon: Horizon) -> f64 {
        let rows = self.timeout_rows(team, horizon);
        let tally = TeamTally::collect(self.log, rows, team);
        let successes = tally
            .expected_successes(self.exclusion_rate(team))
            .unwrap_or(tally.goals as f64);
        let attempts = tally.possessions + tally.timeouts;
        if attempts == 0 {
            return 0.0;
        }
        successes / attempts as f64 * 100.0
    }

    pub fn team_rates(&self, team: TeamId, horizons: &[Horizon]) -> TeamRates {
        let exclusion = self.exclusion_rate(team);
        TeamRates {
            team,
            exclusion_success_rate: exclusion,
            success_rate_general: general_success_rate(self.log, team, exclusion),
            horizons: horizons
                .iter()
                .map(|&h| (h, self.timeout_rate(team, h)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Event, EventKind};
    use proptest::prelude::*;

    const A: TeamId = TeamId(1);
    const B: TeamId = TeamId(2);

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_exclusion_rate_scenario() {
        let log = EventLog::new(vec![
            Event::shot(1, 1.0, 1, false),
            Event::exclusion(1, 2.0, 1),
            Event::shot(1, 3.0, 1, true),
        ]);
        let calc = RateCalculator::new(&log, WindowBound::Inclusive);
        assert_eq!(calc.exclusion_blocks().rows(), &[1, 2]);
        assert_eq!(calc.exclusion_rate(A), Rate::Defined(1.0));
    }

    #[test]
    fn test_exclusion_rate_undefined_without_exclusions() {
        let log = EventLog::new(vec![Event::shot(1, 1.0, 1, true), Event::exclusion(1, 2.0, 2)]);
        let calc = RateCalculator::new(&log, WindowBound::Inclusive);
        assert_eq!(calc.exclusion_rate(A), Rate::Undefined);
        assert_eq!(calc.exclusion_rate(B), Rate::Defined(0.0));
    }

    #[test]
    fn test_general_rate_with_expected_exclusions() {
        // A: possessions at rows 0, 4, 6 => 3 attempts
        // goals: rows 2 and 6 => 2; exclusions: row 1 (rate 1/1) => +1
        let log = EventLog::new(vec![
            Event::shot(1, 1.0, 1, false),
            Event::exclusion(1, 2.0, 1),
            Event::shot(1, 3.0, 1, true),
            Event::shot(1, 4.0, 2, false),
            Event::shot(1, 5.0, 1, false),
            Event::shot(1, 6.0, 2, true),
            Event::shot(1, 7.0, 1, true),
        ]);
        let calc = RateCalculator::new(&log, WindowBound::Inclusive);

        match calc.general_rate(A) {
            Rate::Defined(v) => assert_close(v, 3.0 / 3.0 * 100.0),
            Rate::Undefined => panic!("rate should be defined"),
        }
        match calc.general_rate(B) {
            Rate::Defined(v) => assert_close(v, 50.0),
            Rate::Undefined => panic!("rate should be defined"),
        }
    }

    #[test]
    fn test_general_rate_undefined_without_attempts() {
        let log = EventLog::new(vec![
            Event::shot(1, 1.0, 1, true),
            Event::timeout(1, 2.0, None, 2),
        ]);
        let calc = RateCalculator::new(&log, WindowBound::Inclusive);
        assert_eq!(calc.general_rate(B), Rate::Undefined);
        assert!(calc.general_rate(A).is_defined());
    }

    #[test]
    fn test_timeout_horizon_falls_back_to_zero() {
        let log = EventLog::new(vec![Event::shot(1, 1.0, 1, true)]);
        let calc = RateCalculator::new(&log, WindowBound::Inclusive);
        assert_eq!(calc.timeout_rate(B, Horizon::minutes(2)), 0.0);
        assert_eq!(calc.timeout_rate(B, Horizon::Immediate), 0.0);
        // distinct from the whole-log rate, which is undefined
        assert_eq!(calc.general_rate(B), Rate::Undefined);
    }

    #[test]
    fn test_windowed_timeout_rate() {
        // B calls a timeout at 100s; window 120s covers rows 0..=3
        let log = EventLog::new(vec![
            Event::timeout(1, 100.0, None, 2),
            Event::shot(1, 110.0, 2, true),
            Event::shot(1, 150.0, 1, false),
            Event::shot(1, 200.0, 2, false),
            Event::shot(1, 300.0, 2, true),
        ]);
        let calc = RateCalculator::new(&log, WindowBound::Inclusive);

        assert_eq!(calc.timeout_rows(B, Horizon::minutes(2)), vec![0, 1, 2, 3]);
        // goals 1; possessions rows 1 and 3; timeouts 1 => 1 / 3
        assert_close(calc.timeout_rate(B, Horizon::minutes(2)), 100.0 / 3.0);
        // A called no timeout
        assert_eq!(calc.timeout_rate(A, Horizon::minutes(2)), 0.0);
    }

    #[test]
    fn test_immediate_filters_after_segmentation() {
        // Timeout called by A but the row is credited to B; its block is B's run
        let log = EventLog::new(vec![
            Event::shot(1, 1.0, 1, false),
            Event::timeout(1, 2.0, Some(2), 1),
            Event::shot(1, 3.0, 2, true),
            Event::shot(1, 4.0, 1, false),
        ]);
        let calc = RateCalculator::new(&log, WindowBound::Inclusive);

        assert_eq!(calc.timeout_rows(B, Horizon::Immediate), vec![1, 2]);
        assert!(calc.timeout_rows(A, Horizon::Immediate).is_empty());
        // B: goal row 2, possession start row 1, no own timeout => 1 / 1
        assert_close(calc.timeout_rate(B, Horizon::Immediate), 100.0);
        assert_eq!(calc.timeout_rate(A, Horizon::Immediate), 0.0);
    }

    #[test]
    fn test_team_rates_diff() {
        let log = EventLog::new(vec![
            Event::timeout(1, 10.0, Some(1), 1),
            Event::shot(1, 20.0, 1, true),
            Event::shot(1, 30.0, 2, false),
            Event::shot(1, 400.0, 1, false),
        ]);
        let calc = RateCalculator::new(&log, WindowBound::Inclusive);
        let rates = calc.team_rates(A, &[Horizon::Immediate, Horizon::minutes(2)]);

        // general: 1 goal / 2 possessions
        assert_eq!(rates.success_rate_general, Rate::Defined(50.0));
        // immediate rows 0,1: 1 goal / (1 possession + 1 timeout)
        assert_close(rates.horizons[&Horizon::Immediate], 50.0);
        assert_eq!(rates.diff(Horizon::Immediate), Some(0.0));
        assert_eq!(rates.diff(Horizon::minutes(4)), None);
    }

    #[test]
    fn test_expected_successes() {
        let tally = TeamTally {
            goals: 2,
            exclusions: 4,
            possessions: 10,
            timeouts: 0,
        };
        assert_eq!(tally.expected_successes(Rate::Defined(0.5)), Some(4.0));
        assert_eq!(tally.expected_successes(Rate::Undefined), None);

        let no_exclusions = TeamTally {
            exclusions: 0,
            ..tally
        };
        assert_eq!(no_exclusions.expected_successes(Rate::Undefined), Some(2.0));
    }

    #[test]
    fn test_rate_serializes_as_optional_number() {
        assert_eq!(serde_json::to_string(&Rate::Defined(0.5)).unwrap(), "0.5");
        assert_eq!(serde_json::to_string(&Rate::Undefined).unwrap(), "null");
    }

    proptest! {
        #[test]
        fn prop_general_rate_ignores_team_order(
            rows in prop::collection::vec((0u32..600, 1i64..=4, 0u8..3), 1..50)
        ) {
            let events: Vec<Event> = rows
                .iter()
                .map(|&(t, team, kind)| match kind {
                    0 => Event::shot(1, t as f64, team, t % 3 == 0),
                    1 => Event::exclusion(1, t as f64, team),
                    _ => Event::new(1, t as f64, Some(team), EventKind::Other("Pass".into())),
                })
                .collect();
            let log = EventLog::new(events);
            let calc = RateCalculator::new(&log, WindowBound::Inclusive);

            let teams: Vec<TeamId> = log.teams().into_iter().collect();
            let forward: Vec<Rate> = teams.iter().map(|&t| calc.general_rate(t)).collect();
            let mut backward: Vec<Rate> = teams.iter().rev().map(|&t| calc.general_rate(t)).collect();
            backward.reverse();
            prop_assert_eq!(forward, backward);
        }
    }
}
