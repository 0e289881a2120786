//! # onair Core Library
//!
//! This library provides the logic of the onair indicator: a headless box
//! with four lights that shows whether a category of programme (music, by
//! default) is on air now, starts soon, airs later today, or not at all.
//! The `onair` CLI binary is a thin bootstrap layer over the same library.
//!
//! ## Architecture
//!
//! - **Extractor**: pulls the schedule page in fixed-size chunks and isolates
//!   the embedded JSON between two sentinels
//! - **Decoder**: turns that JSON into the day's airing intervals
//! - **Classifier**: maps intervals plus "now" onto a [`DisplayState`]
//! - **Orchestrator**: a polled state machine running the schedule and
//!   display cadences; the caller invokes `tick()` with the current time
//!
//! ## Key Components
//!
//! - [`Orchestrator`]: Refresh state machine
//! - [`ScheduleWindow`]: One day's airings of the tracked category
//! - [`Config`]: Indicator configuration
//! - [`OutputLines`], [`ScheduleSource`], [`Clock`]: Seams to hardware,
//!   network and time

pub mod clock;
pub mod config;
pub mod decode;
pub mod error;
pub mod extract;
pub mod network;
pub mod orchestrator;
pub mod output;
pub mod source;
pub mod status;
pub mod time;
pub mod window;

pub use clock::{Clock, PlausibleClock, Sleeper, SystemClock, ThreadSleeper, TimeSync};
pub use config::Config;
pub use decode::{decode, decode_document, MUSIC_CATEGORY};
pub use error::{
    ConfigError, ConnectivityError, CoreError, DecodeError, ExtractError, RefreshError,
    SourceError, TimeSyncError, ValidationError,
};
pub use extract::{extract, extract_with_chunk_size, Extractor, END_SENTINEL, START_SENTINEL};
pub use network::{Connectivity, HostConnectivity};
pub use orchestrator::{Orchestrator, RefreshOutcome, RefreshSettings, RefreshState, TickReport};
pub use output::{LogOutput, OutputLines, RecordingOutput, SysfsGpio};
pub use source::{HttpSource, ScheduleSource};
pub use status::{classify, DisplayState, OutputPattern};
pub use time::{CivilTime, TimeInstant};
pub use window::{Interval, ScheduleWindow};
