//! # Horizon
//!
//! How far after a timeout the analysis looks.
//!
//! - `Immediate` - the team-continuity block (until the attributed team changes)
//! - `Window` - every row within N seconds of the timeout, same match

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Window sizes the analysis is usually run with, in seconds.
pub const STANDARD_WINDOWS_SECS: [u32; 4] = [120, 180, 240, 300];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Horizon {
    Immediate,
    Window { seconds: u32 },
}

impl Horizon {
    pub const fn minutes(minutes: u32) -> Self {
        Horizon::Window {
            seconds: minutes * 60,
        }
    }

    /// Column/condition label: `immediate`, `2mins`, `90secs`.
    pub fn label(&self) -> String {
        match self {
            Horizon::Immediate => "immediate".to_string(),
            Horizon::Window { seconds } if seconds % 60 == 0 => format!("{}mins", seconds / 60),
            Horizon::Window { seconds } => format!("{}secs", seconds),
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for Horizon {
    type Err = ConfigError;

    /// Accepts `immediate`, `2min`, `2mins`, `2m`, `120s`, `120secs`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "immediate" {
            return Ok(Horizon::Immediate);
        }

        let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (number, unit) = s.split_at(digits_end);
        let value: u32 = number
            .parse()
            .map_err(|_| ConfigError::InvalidHorizon(s.clone()))?;
        if value == 0 {
            return Err(ConfigError::InvalidHorizon(s.clone()));
        }

        match unit {
            "m" | "min" | "mins" | "minutes" => {
                let seconds = value
                    .checked_mul(60)
                    .ok_or_else(|| ConfigError::InvalidHorizon(s.clone()))?;
                Ok(Horizon::Window { seconds })
            }
            "s" | "sec" | "secs" | "seconds" => Ok(Horizon::Window { seconds: value }),
            _ => Err(ConfigError::InvalidHorizon(s.clone())),
        }
    }
}

impl TryFrom<String> for Horizon {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Horizon> for String {
    fn from(h: Horizon) -> Self {
        h.label()
    }
}
