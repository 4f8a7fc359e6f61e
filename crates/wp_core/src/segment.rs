//! # Block Segmenter
//!
//! Cuts the event log into blocks that follow a trigger row (an exclusion or
//! a timeout call).
//!
//! ## Algorithm
//! 1. Find every row matching the [`Trigger`]
//! 2. From each trigger, prefix-scan forward with the [`ContinuationRule`];
//!    the scan stops at the first row that fails the rule
//! 3. Merge the blocks, keeping each physical row once (first trigger wins
//!    the attribution) in log order
//!
//! Both rules include the trigger row itself, so a trigger on the last row
//! yields a singleton block.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::horizon::Horizon;
use crate::model::{Event, EventLog, TeamId};

/// Forward prefix scan: `start..end`, where `end` is the first index after
/// `start` whose item fails `keep`.
///
/// The start item is always part of the range. Returns an empty range when
/// `start` is past the end.
pub fn take_while_from<T, P>(items: &[T], start: usize, mut keep: P) -> Range<usize>
where
    P: FnMut(&T) -> bool,
{
    if start >= items.len() {
        return items.len()..items.len();
    }
    let end = items[start + 1..]
        .iter()
        .position(|item| !keep(item))
        .map_or(items.len(), |offset| start + 1 + offset);
    start..end
}

/// Whether a row exactly `W` seconds after the trigger is still in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowBound {
    /// `elapsed <= W`
    #[default]
    Inclusive,
    /// `elapsed < W`
    Exclusive,
}

impl WindowBound {
    pub fn admits(&self, elapsed: f64, window: f64) -> bool {
        match self {
            WindowBound::Inclusive => elapsed <= window,
            WindowBound::Exclusive => elapsed < window,
        }
    }
}

impl FromStr for WindowBound {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inclusive" => Ok(WindowBound::Inclusive),
            "exclusive" => Ok(WindowBound::Exclusive),
            other => Err(ConfigError::InvalidWindowBound(other.to_string())),
        }
    }
}

/// Rule deciding whether the row after a block still belongs to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContinuationRule {
    /// Rows keep the trigger row's `team_id`
    TeamContinuity,
    /// Rows stay in the trigger's match and within `seconds` of it
    TimeWindow { seconds: f64, bound: WindowBound },
}

impl ContinuationRule {
    pub fn for_horizon(horizon: Horizon, bound: WindowBound) -> Self {
        match horizon {
            Horizon::Immediate => ContinuationRule::TeamContinuity,
            Horizon::Window { seconds } => ContinuationRule::TimeWindow {
                seconds: seconds as f64,
                bound,
            },
        }
    }

    /// Rows belonging to the block opened at `start`.
    pub fn block_from(&self, events: &[Event], start: usize) -> Range<usize> {
        let Some(trigger) = events.get(start) else {
            return events.len()..events.len();
        };

        match *self {
            ContinuationRule::TeamContinuity => match trigger.team_id {
                // A null team never equals anything, itself included
                None => start..start + 1,
                Some(team) => take_while_from(events, start, |e| e.team_id == Some(team)),
            },
            ContinuationRule::TimeWindow { seconds, bound } => {
                let t0 = trigger.game_time_seconds;
                let match_id = trigger.match_id;
                take_while_from(events, start, |e| {
                    e.match_id == match_id && bound.admits(e.game_time_seconds - t0, seconds)
                })
            }
        }
    }
}

/// Which rows open a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `type == "Exclusion"`
    Exclusion,
    /// Any timeout call
    Timeout,
    /// Timeout calls made by one team
    TimeoutBy(TeamId),
}

impl Trigger {
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Trigger::Exclusion => event.is_exclusion(),
            Trigger::Timeout => event.is_timeout_call(),
            Trigger::TimeoutBy(team) => event.timeout_team_id == Some(*team),
        }
    }

    /// Team the block is attributed to.
    pub fn owner(&self, event: &Event) -> Option<TeamId> {
        match self {
            Trigger::Exclusion => event.team_id,
            Trigger::Timeout | Trigger::TimeoutBy(_) => event.timeout_team_id,
        }
    }
}

/// One trigger and the rows it claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Row index of the trigger
    pub trigger: usize,
    /// Team owning the trigger
    pub team: Option<TeamId>,
    /// Rows claimed by the trigger, before deduplication
    pub rows: Range<usize>,
}

impl Block {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Deduplicated union of the blocks from one segmentation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    blocks: Vec<Block>,
    /// Distinct row indices in first-claim order
    rows: Vec<usize>,
    /// Owner of the trigger that first claimed each entry of `rows`
    owners: Vec<Option<TeamId>>,
}

impl BlockSet {
    fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut seen = FxHashSet::default();
        let mut rows = Vec::new();
        let mut owners = Vec::new();

        for block in &blocks {
            for row in block.rows.clone() {
                if seen.insert(row) {
                    rows.push(row);
                    owners.push(block.team);
                }
            }
        }

        Self {
            blocks,
            rows,
            owners,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// `(row, owner)` pairs in order.
    pub fn attributed_rows(&self) -> impl Iterator<Item = (usize, Option<TeamId>)> + '_ {
        self.rows.iter().copied().zip(self.owners.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Segment the whole log: one block per trigger row, merged into a [`BlockSet`].
pub fn segment(log: &EventLog, trigger: Trigger, rule: ContinuationRule) -> BlockSet {
    let events = log.events();
    let blocks: Vec<Block> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| trigger.matches(e))
        .map(|(idx, e)| Block {
            trigger: idx,
            team: trigger.owner(e),
            rows: rule.block_from(events, idx),
        })
        .collect();

    let set = BlockSet::from_blocks(blocks);
    tracing::debug!(
        ?trigger,
        ?rule,
        blocks = set.blocks().len(),
        rows = set.len(),
        "segmentation pass"
    );
    set
}
