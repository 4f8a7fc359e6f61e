//! End-to-end runs over a six-match fixture (four teams).

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use wp_core::segment::{segment, ContinuationRule, Trigger, WindowBound};
use wp_core::{
    load_events, run_analysis, verify_outputs, write_outputs, AnalysisConfig, EventLog, Horizon,
    OutputConfig, Rate, TeamId,
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/match_events.csv")
}

fn fixture() -> EventLog {
    load_events(&fixture_path()).expect("fixture should load")
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_fixture_loads_and_is_ordered() {
    let log = fixture();
    assert_eq!(log.len(), 776);
    assert_eq!(log.match_count(), 6);
    assert_eq!(
        log.teams().into_iter().collect::<Vec<_>>(),
        vec![TeamId(1), TeamId(2), TeamId(3), TeamId(4)]
    );

    let ordered = log.events().windows(2).all(|w| {
        (w[0].match_id, w[0].game_time_seconds) <= (w[1].match_id, w[1].game_time_seconds)
    });
    assert!(ordered);
}

#[test]
fn test_full_analysis_rates() {
    let log = fixture();
    let report = run_analysis(&log, &AnalysisConfig::default()).unwrap();

    assert_eq!(report.team_rates.len(), 4);
    assert!(report.excluded_teams.is_empty());

    let team1 = &report.team_rates[0];
    assert_eq!(team1.team, TeamId(1));
    match team1.exclusion_success_rate {
        Rate::Defined(v) => assert_close(v, 1.0 / 3.0),
        Rate::Undefined => panic!("team 1 has exclusions"),
    }
    assert_close(team1.success_rate_general.value().unwrap(), 34.375);
    assert_close(team1.horizons[&Horizon::Immediate], 50.0);

    let team2 = &report.team_rates[1];
    assert_eq!(team2.exclusion_success_rate, Rate::Defined(0.75));
    assert_close(team2.horizons[&Horizon::Immediate], 60.0);
    assert_close(team2.horizons[&Horizon::minutes(5)], 46.0);

    let team4 = &report.team_rates[3];
    assert_close(team4.horizons[&Horizon::minutes(2)], 100.0 / 3.0);
}

#[test]
fn test_full_analysis_produces_twelve_test_rows() {
    let log = fixture();
    let report = run_analysis(&log, &AnalysisConfig::default()).unwrap();

    assert_eq!(report.tests.len(), 12);
    let layout: Vec<(&str, &str)> = report
        .tests
        .iter()
        .map(|r| (r.test, r.condition.as_str()))
        .collect();
    assert_eq!(&layout[..3], &[
        ("Paired t-test", "2mins"),
        ("Paired t-test", "4mins"),
        ("Paired t-test", "immediate"),
    ]);
    assert_eq!(layout[11], ("Spearman", "immediate"));

    for row in &report.tests {
        assert!(row.outcome.statistic.is_finite(), "{row:?}");
        assert!((0.0..=1.0).contains(&row.outcome.p_value), "{row:?}");
    }
}

#[test]
fn test_rerun_is_byte_identical() {
    let log = fixture();
    let config = AnalysisConfig::default();

    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let first = OutputConfig {
        dir: first_dir.path().to_path_buf(),
        ..OutputConfig::default()
    };
    let second = OutputConfig {
        dir: second_dir.path().to_path_buf(),
        ..OutputConfig::default()
    };

    write_outputs(&run_analysis(&log, &config).unwrap(), &first).unwrap();
    write_outputs(&run_analysis(&fixture(), &config).unwrap(), &second).unwrap();

    for (a, b) in [
        (first.rates_path(), second.rates_path()),
        (first.tests_path(), second.tests_path()),
        (first.summary_path(), second.summary_path()),
    ] {
        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }

    let summary = verify_outputs(&first).unwrap();
    assert_eq!(summary.event_count, 776);
    assert_eq!(summary.test_rows, 12);
}

#[test]
fn test_rate_table_has_diff_columns() {
    let log = fixture();
    let report = run_analysis(&log, &AnalysisConfig::default()).unwrap();
    let dir = TempDir::new().unwrap();
    let output = OutputConfig {
        dir: dir.path().to_path_buf(),
        ..OutputConfig::default()
    };
    write_outputs(&report, &output).unwrap();

    let text = fs::read_to_string(output.rates_path()).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "team_id,exclusion_success_rate,success_rate_general,\
         success_rate_immediate,success_rate_2mins,success_rate_4mins,success_rate_5mins,\
         diff_immediate,diff_2mins,diff_4mins,diff_5mins"
    );
    assert_eq!(text.lines().count(), 5);
}

#[test]
fn test_fixture_blocks_respect_rules() {
    let log = fixture();
    let events = log.events();

    let exclusions = segment(&log, Trigger::Exclusion, ContinuationRule::TeamContinuity);
    for block in exclusions.blocks() {
        let team = events[block.trigger].team_id;
        assert!(block.rows.clone().all(|row| events[row].team_id == team));
        if block.rows.end < events.len() {
            assert_ne!(events[block.rows.end].team_id, team);
        }
    }

    let rule = ContinuationRule::TimeWindow {
        seconds: 120.0,
        bound: WindowBound::Inclusive,
    };
    let windows = segment(&log, Trigger::Timeout, rule);
    for block in windows.blocks() {
        let start = &events[block.trigger];
        for row in block.rows.clone() {
            assert_eq!(events[row].match_id, start.match_id);
            assert!(events[row].game_time_seconds - start.game_time_seconds <= 120.0);
        }
    }
}

#[test]
fn test_team_subset_keeps_ascending_order() {
    let log = fixture();
    let config = AnalysisConfig {
        teams: vec![4, 2, 3],
        ..AnalysisConfig::default()
    };
    let report = run_analysis(&log, &config).unwrap();
    let teams: Vec<TeamId> = report.team_rates.iter().map(|r| r.team).collect();
    assert_eq!(teams, vec![TeamId(2), TeamId(3), TeamId(4)]);

    // per-team rates do not depend on which other teams are analysed
    let full = run_analysis(&log, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.team_rates[..], full.team_rates[1..]);
}
