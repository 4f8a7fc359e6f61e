//! Water-polo exclusion / timeout analysis CLI
//!
//! CSV event log → success rate table + statistical test table

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use wp_core::config::parse_horizon_list;
use wp_core::segment::{segment, BlockSet, ContinuationRule, Trigger, WindowBound};
use wp_core::{AnalysisConfig, EventLog, Horizon, OutputConfig, RunSummary};

#[derive(Parser)]
#[command(name = "wp_analysis")]
#[command(about = "Exclusion and timeout impact on water-polo scoring success", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute success rates and run the paired tests
    Analyze {
        /// Event log CSV (falls back to WP_EVENTS_PATH)
        #[arg(long)]
        events: Option<PathBuf>,

        /// Output directory (falls back to WP_OUTPUT_DIR)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Start from every standard window (2, 3, 4, 5 min), all compared
        #[arg(long, conflicts_with = "config")]
        exhaustive: bool,

        /// Horizons for the rate table, e.g. "immediate,2min,4min,5min"
        #[arg(long)]
        horizons: Option<String>,

        /// Horizons to run the tests on, e.g. "2min,4min,immediate"
        #[arg(long)]
        compare: Option<String>,

        /// Include rows exactly at the window edge
        #[arg(long, value_enum)]
        window_bound: Option<BoundArg>,

        /// Restrict the analysis to these teams (repeatable)
        #[arg(long = "team")]
        teams: Vec<i64>,
    },

    /// Print the rows of every trigger block as CSV
    Blocks {
        /// Event log CSV
        #[arg(long)]
        events: PathBuf,

        #[arg(long, value_enum, default_value = "exclusion")]
        trigger: TriggerArg,

        /// Continuation horizon: "immediate" or a window such as "2min"
        #[arg(long, default_value = "immediate")]
        horizon: String,

        /// Only timeouts called by this team
        #[arg(long)]
        team: Option<i64>,

        #[arg(long, value_enum, default_value = "inclusive")]
        window_bound: BoundArg,
    },

    /// Check the written tables against the summary checksums
    Verify {
        /// Directory holding the summary and the tables (falls back to WP_OUTPUT_DIR)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// YAML configuration file the run was made with (output file names)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TriggerArg {
    Exclusion,
    Timeout,
}

#[derive(Clone, Copy, ValueEnum)]
enum BoundArg {
    Inclusive,
    Exclusive,
}

impl From<BoundArg> for WindowBound {
    fn from(arg: BoundArg) -> Self {
        match arg {
            BoundArg::Inclusive => WindowBound::Inclusive,
            BoundArg::Exclusive => WindowBound::Exclusive,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("wp_core=info".parse()?)
                .add_directive("wp_analysis=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            events,
            out_dir,
            config,
            exhaustive,
            horizons,
            compare,
            window_bound,
            teams,
        } => {
            let mut cfg = load_config(config.as_deref(), exhaustive)?;
            if let Some(events) = events {
                cfg.events_path = Some(events);
            }
            if let Some(dir) = out_dir {
                cfg.output.dir = dir;
            }
            if let Some(list) = horizons {
                cfg.horizons = parse_horizon_list(&list)?;
            }
            if let Some(list) = compare {
                cfg.compared_horizons = parse_horizon_list(&list)?;
            }
            if let Some(bound) = window_bound {
                cfg.window_bound = bound.into();
            }
            if !teams.is_empty() {
                cfg.teams = teams;
            }
            run_analyze(&cfg)?;
        }

        Commands::Blocks {
            events,
            trigger,
            horizon,
            team,
            window_bound,
        } => {
            let horizon: Horizon = horizon.parse()?;
            let trigger = match (trigger, team) {
                (TriggerArg::Exclusion, _) => Trigger::Exclusion,
                (TriggerArg::Timeout, Some(team)) => Trigger::TimeoutBy(wp_core::TeamId(team)),
                (TriggerArg::Timeout, None) => Trigger::Timeout,
            };
            let rule = ContinuationRule::for_horizon(horizon, window_bound.into());
            print_blocks(&events, trigger, rule)?;
        }

        Commands::Verify { out_dir, config } => {
            let mut output = load_config(config.as_deref(), false)?.output;
            if let Some(dir) = out_dir {
                output.dir = dir;
            }
            run_verify(&output)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>, exhaustive: bool) -> Result<AnalysisConfig> {
    let base = match path {
        Some(path) => AnalysisConfig::from_yaml_file(path)?,
        None if exhaustive => AnalysisConfig::exhaustive(),
        None => AnalysisConfig::default(),
    };
    Ok(base.with_env_overrides()?)
}

fn run_analyze(cfg: &AnalysisConfig) -> Result<()> {
    // configuration problems abort before the log is touched
    let events_path = cfg.require_events_path()?;
    cfg.validate()?;
    cfg.log_effective();

    println!("📊 Analysing exclusions and timeouts...");
    println!("   Events: {}", events_path.display());
    println!("   Output: {}", cfg.output.dir.display());

    let log = wp_core::load_events(events_path)
        .with_context(|| format!("Failed to load event log: {}", events_path.display()))?;
    let report = wp_core::run_analysis(&log, cfg).context("Analysis failed")?;
    let summary = wp_core::write_outputs(&report, &cfg.output).with_context(|| {
        format!("Failed to write outputs to {}", cfg.output.dir.display())
    })?;

    print_summary(&summary);
    Ok(())
}

fn run_verify(output: &OutputConfig) -> Result<RunSummary> {
    println!("🔍 Verifying outputs in {}...", output.dir.display());
    let summary = wp_core::verify_outputs(output).with_context(|| {
        format!(
            "Verification failed for {}",
            output.summary_path().display()
        )
    })?;
    println!("✅ {} tables match their checksums", summary.outputs.len());
    Ok(summary)
}

fn print_summary(summary: &RunSummary) {
    println!("\n✅ Analysis complete");
    println!("   Events:   {} ({} matches)", summary.event_count, summary.match_count);
    println!("   Teams:    {}", summary.team_count);
    println!("   Horizons: {}", summary.horizons.join(", "));
    println!("   Tests:    {} rows", summary.test_rows);
    if !summary.excluded_teams.is_empty() {
        println!(
            "   ⚠ Undefined general rate (left out of tests): {:?}",
            summary.excluded_teams
        );
    }
    for output in &summary.outputs {
        println!("   {} ({} bytes, sha256 {})", output.file, output.bytes, output.sha256);
    }
}

fn print_blocks(events_path: &Path, trigger: Trigger, rule: ContinuationRule) -> Result<()> {
    let log = wp_core::load_events(events_path)
        .with_context(|| format!("Failed to load event log: {}", events_path.display()))?;
    let blocks = segment(&log, trigger, rule);
    write_blocks(io::stdout().lock(), &log, &blocks)?;

    tracing::info!(
        blocks = blocks.blocks().len(),
        rows = blocks.len(),
        "blocks printed"
    );
    Ok(())
}

/// One CSV line per attributed block row, with the previous-row fields.
fn write_blocks<W: io::Write>(writer: W, log: &EventLog, blocks: &BlockSet) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record([
        "row",
        "owner",
        "matchId",
        "game_time_seconds",
        "team_id",
        "type",
        "shot_isGoal",
        "timeout_teamId",
        "team_id_last",
        "game_time_seconds_last",
    ])?;
    let opt = |v: Option<String>| v.unwrap_or_default();
    for (row, owner) in blocks.attributed_rows() {
        let Some(event) = log.get(row) else { continue };
        out.write_record([
            row.to_string(),
            opt(owner.map(|t| t.to_string())),
            event.match_id.to_string(),
            event.game_time_seconds.to_string(),
            opt(event.team_id.map(|t| t.to_string())),
            event.kind.to_string(),
            opt(event.shot_is_goal.map(|g| g.to_string())),
            opt(event.timeout_team_id.map(|t| t.to_string())),
            opt(log.previous_team(row).map(|t| t.to_string())),
            opt(log.previous_time(row).map(|t| t.to_string())),
        ])?;
    }
    out.flush()?;
    Ok(())
}
