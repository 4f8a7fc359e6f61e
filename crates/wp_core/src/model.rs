//! # Event Model
//!
//! One row of the match event log plus the ordered, immutable [`EventLog`]
//! every analysis pass reads from.
//!
//! Rows are ordered by `(match_id, game_time_seconds)`. The "previous row"
//! fields used for possession detection (`team_id_last`,
//! `game_time_seconds_last`) are derived on demand from the whole log rather
//! than stored per event.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a team as it appears in `team_id` / `timeout_teamId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a match (`matchId`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub i64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event category (the `type` column).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Shot,
    Exclusion,
    Timeout,
    /// Any category the analysis does not interpret (passes, turnovers, ...)
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Shot => "Shot",
            EventKind::Exclusion => "Exclusion",
            EventKind::Timeout => "Timeout",
            EventKind::Other(s) => s,
        }
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Shot" => EventKind::Shot,
            "Exclusion" => EventKind::Exclusion,
            "Timeout" => EventKind::Timeout,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row of the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Team credited with the event (None for neutral rows)
    pub team_id: Option<TeamId>,
    /// Event category
    pub kind: EventKind,
    /// Goal flag, only meaningful for shots
    pub shot_is_goal: Option<bool>,
    /// Team calling a timeout, None for every other row
    pub timeout_team_id: Option<TeamId>,
    pub match_id: MatchId,
    /// Seconds since match start, monotonic within a match
    pub game_time_seconds: f64,
}

impl Event {
    pub fn new(match_id: i64, game_time_seconds: f64, team: Option<i64>, kind: EventKind) -> Self {
        Self {
            team_id: team.map(TeamId),
            kind,
            shot_is_goal: None,
            timeout_team_id: None,
            match_id: MatchId(match_id),
            game_time_seconds,
        }
    }

    /// Shot row with the given outcome.
    pub fn shot(match_id: i64, t: f64, team: i64, goal: bool) -> Self {
        let mut event = Self::new(match_id, t, Some(team), EventKind::Shot);
        event.shot_is_goal = Some(goal);
        event
    }

    pub fn exclusion(match_id: i64, t: f64, team: i64) -> Self {
        Self::new(match_id, t, Some(team), EventKind::Exclusion)
    }

    /// Timeout row called by `caller`, credited to `team` (may differ or be null).
    pub fn timeout(match_id: i64, t: f64, team: Option<i64>, caller: i64) -> Self {
        let mut event = Self::new(match_id, t, team, EventKind::Timeout);
        event.timeout_team_id = Some(TeamId(caller));
        event
    }

    pub fn is_goal(&self) -> bool {
        self.shot_is_goal == Some(true)
    }

    pub fn is_exclusion(&self) -> bool {
        self.kind == EventKind::Exclusion
    }

    pub fn is_timeout_call(&self) -> bool {
        self.timeout_team_id.is_some()
    }

    pub fn belongs_to(&self, team: TeamId) -> bool {
        self.team_id == Some(team)
    }
}

/// Ordered, immutable snapshot of the event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Build a log, ordering rows by `(match_id, game_time_seconds)`.
    ///
    /// The sort is stable: rows sharing a timestamp keep their input order.
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by(|a, b| {
            a.match_id
                .cmp(&b.match_id)
                .then(a.game_time_seconds.total_cmp(&b.game_time_seconds))
        });
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, idx: usize) -> Option<&Event> {
        self.events.get(idx)
    }

    /// `team_id_last`: team of the previous row in the whole log.
    pub fn previous_team(&self, idx: usize) -> Option<TeamId> {
        idx.checked_sub(1)
            .and_then(|prev| self.events.get(prev))
            .and_then(|e| e.team_id)
    }

    /// `game_time_seconds_last`: time of the previous row in the whole log.
    pub fn previous_time(&self, idx: usize) -> Option<f64> {
        idx.checked_sub(1)
            .and_then(|prev| self.events.get(prev))
            .map(|e| e.game_time_seconds)
    }

    /// Whether row `idx` opens a new attacking possession for `team`.
    ///
    /// A null previous team (or no previous row) counts as a change.
    pub fn is_possession_start(&self, idx: usize, team: TeamId) -> bool {
        match self.events.get(idx) {
            Some(event) if event.belongs_to(team) => self.previous_team(idx) != Some(team),
            _ => false,
        }
    }

    /// Distinct non-null `team_id` values, ascending.
    pub fn teams(&self) -> BTreeSet<TeamId> {
        self.events.iter().filter_map(|e| e.team_id).collect()
    }

    pub fn match_count(&self) -> usize {
        self.events
            .iter()
            .map(|e| e.match_id)
            .collect::<BTreeSet<_>>()
            .len()
    }
}
