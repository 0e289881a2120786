//! Display states, their output patterns, and the classification policy.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::time::TimeInstant;
use crate::window::ScheduleWindow;

/// Lookahead within which an upcoming airing shows as [`DisplayState::Soon`].
pub const DEFAULT_SOON_HORIZON: Duration = Duration::from_secs(3600);

/// Number of indicator lines.
pub const LINE_COUNT: usize = 4;

/// What the indicator is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    Now,
    Soon,
    Later,
    Never,
    ConfigError,
    ConnectivityError,
    TimeSyncError,
    DecodeError,
}

impl DisplayState {
    pub const ALL: [DisplayState; 8] = [
        DisplayState::Now,
        DisplayState::Soon,
        DisplayState::Later,
        DisplayState::Never,
        DisplayState::ConfigError,
        DisplayState::ConnectivityError,
        DisplayState::TimeSyncError,
        DisplayState::DecodeError,
    ];

    /// Lines are ordered green, yellow, orange, red.
    pub fn pattern(self) -> OutputPattern {
        let bits = match self {
            DisplayState::Now => [true, false, false, false],
            DisplayState::Soon => [false, true, false, false],
            DisplayState::Later => [false, false, true, false],
            DisplayState::Never => [false, false, false, true],
            DisplayState::ConfigError => [false, true, true, true],
            // Network bring-up and schedule download alike.
            DisplayState::ConnectivityError => [false, false, true, true],
            // Clock synchronization only.
            DisplayState::TimeSyncError => [false, true, false, true],
            DisplayState::DecodeError => [false, true, true, false],
        };
        OutputPattern(bits)
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            DisplayState::ConfigError
                | DisplayState::ConnectivityError
                | DisplayState::TimeSyncError
                | DisplayState::DecodeError
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DisplayState::Now => "now",
            DisplayState::Soon => "soon",
            DisplayState::Later => "later",
            DisplayState::Never => "never",
            DisplayState::ConfigError => "config_error",
            DisplayState::ConnectivityError => "connectivity_error",
            DisplayState::TimeSyncError => "time_sync_error",
            DisplayState::DecodeError => "decode_error",
        }
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisplayState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown display state: {s}"))
    }
}

/// One on/off value per indicator line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputPattern(pub [bool; LINE_COUNT]);

impl OutputPattern {
    pub const ALL_ON: OutputPattern = OutputPattern([true; LINE_COUNT]);
    pub const ALL_OFF: OutputPattern = OutputPattern([false; LINE_COUNT]);

    pub fn lines(&self) -> &[bool; LINE_COUNT] {
        &self.0
    }
}

impl fmt::Display for OutputPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &on in &self.0 {
            f.write_str(if on { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Classify `now` against the airings in `window`.
///
/// Intervals are visited in reverse stored order. Every interval that has
/// not ended yields a candidate (`Now` if started, `Soon` if starting within
/// `soon_horizon`, `Later` otherwise) that replaces the previous one, so the
/// unfinished interval stored first decides. Nothing unfinished is `Never`.
pub fn classify(window: &ScheduleWindow, now: TimeInstant, soon_horizon: Duration) -> DisplayState {
    let horizon = now + soon_horizon;
    let mut state = DisplayState::Never;
    for interval in window.iter().rev() {
        if interval.end() > now {
            state = if interval.start() <= now {
                DisplayState::Now
            } else if interval.start() <= horizon {
                DisplayState::Soon
            } else {
                DisplayState::Later
            };
        }
    }
    state
}
