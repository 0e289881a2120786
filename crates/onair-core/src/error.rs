//! Core error types for onair-core.
//!
//! Every failure the indicator can hit is one of these enums. The
//! orchestrator turns refresh failures into a [`DisplayState`] through
//! [`RefreshError::display_state`]; only configuration, initial
//! connectivity and clock failures reach the process boundary.

use std::path::PathBuf;
use thiserror::Error;

use crate::status::DisplayState;
use crate::time::{TimeInstant, TimestampError};

/// Core error type for onair-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Schedule refresh errors
    #[error("Schedule refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    /// Network connectivity errors
    #[error("Connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    /// Clock synchronization errors
    #[error("Time sync error: {0}")]
    TimeSync(#[from] TimeSyncError),
}

impl CoreError {
    /// The indicator pattern to show before giving up on this error.
    pub fn display_state(&self) -> DisplayState {
        match self {
            CoreError::Config(_) => DisplayState::ConfigError,
            CoreError::Refresh(e) => e.display_state(),
            CoreError::Connectivity(_) => DisplayState::ConnectivityError,
            CoreError::TimeSync(_) => DisplayState::TimeSyncError,
        }
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// No home directory to derive the default config location from
    #[error("Cannot determine configuration directory")]
    NoConfigDir,
}

/// Errors from isolating the embedded payload in a byte stream.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("start sentinel not found before end of stream")]
    StartNotFound,

    #[error("end sentinel not found before end of stream")]
    EndNotFound,

    #[error("chunk size must be at least one byte")]
    InvalidChunkSize,

    /// The transport failed mid-stream.
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),
}

/// Errors from turning an extracted payload into a [`ScheduleWindow`](crate::ScheduleWindow).
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("schedule document has no usable '{path}'")]
    SchemaMismatch { path: String },

    #[error("bad timestamp '{value}': {reason}")]
    BadTimestamp {
        value: String,
        #[source]
        reason: TimestampError,
    },

    #[error("entry ends before it starts: {0}")]
    InvertedInterval(#[from] ValidationError),
}

/// Errors from opening the schedule byte stream.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid schedule URL '{0}'")]
    InvalidUrl(String),
}

/// A failed schedule refresh, whichever stage it failed in.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl RefreshError {
    /// Map the failure onto the error state shown on the outputs.
    ///
    /// Transport failures (including a read failing mid-stream) are
    /// connectivity problems; everything about the content is a decode
    /// problem.
    pub fn display_state(&self) -> DisplayState {
        match self {
            RefreshError::Source(_) | RefreshError::Extract(ExtractError::Read(_)) => {
                DisplayState::ConnectivityError
            }
            RefreshError::Extract(_) | RefreshError::Decode(_) => DisplayState::DecodeError,
        }
    }
}

/// Network bring-up errors.
#[derive(Error, Debug)]
pub enum ConnectivityError {
    #[error("cannot resolve {host}: {source}")]
    Unreachable {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{host} resolved to no addresses")]
    NoAddress { host: String },

    #[error("invalid schedule URL '{0}'")]
    InvalidUrl(String),
}

/// Clock synchronization errors.
#[derive(Error, Debug)]
pub enum TimeSyncError {
    #[error("system clock reads {now}, earlier than {floor}")]
    Implausible { now: TimeInstant, floor: TimeInstant },

    #[error("clock not synchronized after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must not precede start ({start})")]
    InvalidTimeRange { start: TimeInstant, end: TimeInstant },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_failure_is_a_connectivity_problem() {
        let err = RefreshError::from(ExtractError::Read(std::io::Error::other("reset")));
        assert_eq!(err.display_state(), DisplayState::ConnectivityError);
    }

    #[test]
    fn missing_sentinel_is_a_decode_problem() {
        let err = RefreshError::from(ExtractError::EndNotFound);
        assert_eq!(err.display_state(), DisplayState::DecodeError);
        let err = RefreshError::from(DecodeError::SchemaMismatch {
            path: "schedule.items".into(),
        });
        assert_eq!(err.display_state(), DisplayState::DecodeError);
    }

    #[test]
    fn source_failure_is_a_connectivity_problem() {
        let err = RefreshError::from(SourceError::Status {
            url: "https://example.invalid/20251012".into(),
            status: 403,
        });
        assert_eq!(err.display_state(), DisplayState::ConnectivityError);
        assert_eq!(err.display_state().pattern().to_string(), "0011");
    }

    #[test]
    fn config_failure_maps_to_config_state() {
        let err = CoreError::from(ConfigError::MissingKey("network.ssid".into()));
        assert_eq!(err.display_state(), DisplayState::ConfigError);
    }
}
