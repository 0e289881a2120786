//! Indicator output lines.
//!
//! The indicator only ever needs "set these four lines to this pattern".
//! [`SysfsGpio`] drives real lines through the kernel GPIO value files,
//! [`LogOutput`] stands in on hosts without lights, and
//! [`RecordingOutput`] keeps every pattern for inspection.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};

use crate::clock::Sleeper;
use crate::config::OutputsConfig;
use crate::status::{OutputPattern, LINE_COUNT};

/// Fill-up sequence shown at power-on: red, then orange, then yellow.
pub const STARTUP_SEQUENCE: [(OutputPattern, Duration); 4] = [
    (OutputPattern([false, false, false, true]), Duration::from_millis(250)),
    (OutputPattern([false, false, true, true]), Duration::from_millis(250)),
    (OutputPattern([false, true, true, true]), Duration::from_millis(250)),
    (OutputPattern::ALL_ON, Duration::from_secs(1)),
];

/// Something that can show an [`OutputPattern`].
///
/// Setting the same pattern twice must be harmless.
pub trait OutputLines {
    fn set(&mut self, pattern: OutputPattern);
}

impl<T: OutputLines + ?Sized> OutputLines for Box<T> {
    fn set(&mut self, pattern: OutputPattern) {
        (**self).set(pattern);
    }
}

/// Lines exported through `/sys/class/gpio/gpioN/value`.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    lines: [PathBuf; LINE_COUNT],
}

impl SysfsGpio {
    pub fn new(lines: [PathBuf; LINE_COUNT]) -> Self {
        Self { lines }
    }
}

impl OutputLines for SysfsGpio {
    fn set(&mut self, pattern: OutputPattern) {
        for (path, &on) in self.lines.iter().zip(pattern.lines()) {
            if let Err(e) = std::fs::write(path, if on { "1" } else { "0" }) {
                warn!(path = %path.display(), "failed to set output line: {e}");
            }
        }
    }
}

/// Logs each pattern instead of driving hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOutput;

impl OutputLines for LogOutput {
    fn set(&mut self, pattern: OutputPattern) {
        info!(%pattern, "outputs");
    }
}

/// Remembers every pattern it was given.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    history: Vec<OutputPattern>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[OutputPattern] {
        &self.history
    }

    pub fn last(&self) -> Option<OutputPattern> {
        self.history.last().copied()
    }
}

impl OutputLines for RecordingOutput {
    fn set(&mut self, pattern: OutputPattern) {
        self.history.push(pattern);
    }
}

/// Build the configured outputs: sysfs lines if configured, logging otherwise.
///
/// Expects a validated config; a wrong number of lines falls back to logging.
pub fn from_config(config: &OutputsConfig) -> Box<dyn OutputLines> {
    match config.lines.clone().map(<[PathBuf; LINE_COUNT]>::try_from) {
        Some(Ok(lines)) => Box::new(SysfsGpio::new(lines)),
        Some(Err(lines)) => {
            warn!(count = lines.len(), "expected {LINE_COUNT} output lines, logging instead");
            Box::new(LogOutput)
        }
        None => Box::new(LogOutput),
    }
}

/// Play [`STARTUP_SEQUENCE`].
pub fn play_startup<O: OutputLines + ?Sized, S: Sleeper + ?Sized>(outputs: &mut O, sleeper: &mut S) {
    for (pattern, hold) in STARTUP_SEQUENCE {
        outputs.set(pattern);
        sleeper.sleep(hold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RecordingSleeper;
    use crate::status::DisplayState;

    #[test]
    fn sysfs_writes_one_value_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let lines: [PathBuf; LINE_COUNT] =
            std::array::from_fn(|i| dir.path().join(format!("gpio{i}")));
        let mut gpio = SysfsGpio::new(lines.clone());

        gpio.set(DisplayState::DecodeError.pattern());

        let values: Vec<String> = lines
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect();
        assert_eq!(values, vec!["0", "1", "1", "0"]);
    }

    #[test]
    fn sysfs_survives_missing_line() {
        let mut gpio = SysfsGpio::new(std::array::from_fn(|i| {
            PathBuf::from(format!("/nonexistent/onair/gpio{i}/value"))
        }));
        gpio.set(OutputPattern::ALL_ON);
    }

    #[test]
    fn recording_keeps_history() {
        let mut out = RecordingOutput::new();
        out.set(OutputPattern::ALL_OFF);
        out.set(DisplayState::Now.pattern());
        assert_eq!(out.history().len(), 2);
        assert_eq!(out.last(), Some(DisplayState::Now.pattern()));
    }

    #[test]
    fn startup_sequence_fills_up() {
        let mut out = RecordingOutput::new();
        let mut sleeper = RecordingSleeper::default();
        play_startup(&mut out, &mut sleeper);
        let shown: Vec<String> = out.history().iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["0001", "0011", "0111", "1111"]);
        assert_eq!(sleeper.total(), Duration::from_millis(1750));
    }

    #[test]
    fn from_config_without_lines_logs() {
        let mut out = from_config(&OutputsConfig::default());
        out.set(OutputPattern::ALL_OFF);
    }
}
