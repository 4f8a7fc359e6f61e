//! # Event Log Loader
//!
//! CSV export of the event query → [`EventLog`].
//!
//! Required columns: `team_id`, `type`, `shot_isGoal`, `timeout_teamId`,
//! `matchId`, `game_time_seconds`. Extra columns are ignored.
//!
//! Exports coming out of dataframe tools write nullable integer columns as
//! floats (`12.0`) and booleans as `True`/`False`; both are accepted. A row
//! that still fails to parse aborts the load with its line number.

use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::model::{Event, EventKind, EventLog, MatchId, TeamId};

#[derive(Debug, Deserialize)]
struct RawEventRow {
    #[serde(default)]
    team_id: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(rename = "shot_isGoal", default)]
    shot_is_goal: String,
    #[serde(rename = "timeout_teamId", default)]
    timeout_team_id: String,
    #[serde(rename = "matchId")]
    match_id: String,
    game_time_seconds: String,
}

/// Load an event log from a CSV file.
pub fn load_events(path: &Path) -> Result<EventLog> {
    let file = File::open(path)?;
    let log = load_events_from_reader(file)?;
    tracing::info!(
        path = %path.display(),
        events = log.len(),
        matches = log.match_count(),
        "event log loaded"
    );
    Ok(log)
}

/// Load an event log from any CSV source with a header row.
pub fn load_events_from_reader<R: Read>(reader: R) -> Result<EventLog> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut events = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw: RawEventRow = record
            .deserialize(Some(&headers))
            .map_err(|e| parse_error(line, e.to_string()))?;
        events.push(parse_row(raw, line)?);
    }

    Ok(EventLog::new(events))
}

fn parse_row(raw: RawEventRow, line: u64) -> Result<Event> {
    let match_id = parse_id(&raw.match_id)
        .map_err(|msg| parse_error(line, format!("matchId: {msg}")))?
        .ok_or_else(|| parse_error(line, "matchId is empty".to_string()))?;

    let game_time_seconds: f64 = raw
        .game_time_seconds
        .parse()
        .map_err(|_| parse_error(line, format!("invalid game_time_seconds '{}'", raw.game_time_seconds)))?;
    if !game_time_seconds.is_finite() {
        return Err(parse_error(line, "game_time_seconds is not finite".to_string()));
    }

    Ok(Event {
        team_id: parse_id(&raw.team_id)
            .map_err(|msg| parse_error(line, format!("team_id: {msg}")))?
            .map(TeamId),
        kind: EventKind::from(raw.kind.as_str()),
        shot_is_goal: parse_flag(&raw.shot_is_goal)
            .map_err(|msg| parse_error(line, format!("shot_isGoal: {msg}")))?,
        timeout_team_id: parse_id(&raw.timeout_team_id)
            .map_err(|msg| parse_error(line, format!("timeout_teamId: {msg}")))?
            .map(TeamId),
        match_id: MatchId(match_id),
        game_time_seconds,
    })
}

fn parse_error(line: u64, message: String) -> AnalysisError {
    AnalysisError::Parse { line, message }
}

/// Nullable integer id. Accepts `12`, `12.0`, and empty / `NaN` / `NULL` as null.
fn parse_id(s: &str) -> std::result::Result<Option<i64>, String> {
    let s = s.trim();
    if is_null(s) {
        return Ok(None);
    }
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
        _ => Err(format!("invalid identifier '{s}'")),
    }
}

/// Nullable boolean flag.
fn parse_flag(s: &str) -> std::result::Result<Option<bool>, String> {
    let s = s.trim();
    if is_null(s) {
        return Ok(None);
    }
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "1.0" => Ok(Some(true)),
        "false" | "f" | "0" | "0.0" => Ok(Some(false)),
        _ => Err(format!("invalid boolean '{s}'")),
    }
}

fn is_null(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") || s == "None"
}
