//! Wall clock, sleeping, and clock synchronization.
//!
//! Everything time-dependent takes these as parameters so tests can drive
//! the indicator with made-up instants and without real delays.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::TimeSyncError;
use crate::output::OutputLines;
use crate::status::DisplayState;
use crate::time::TimeInstant;

/// Source of the current instant.
pub trait Clock {
    fn now(&self) -> TimeInstant;
}

/// The host's UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeInstant {
        Utc::now().into()
    }
}

/// Blocks the calling thread.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Returns immediately and records what it was asked to sleep.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    naps: Vec<Duration>,
}

impl RecordingSleeper {
    pub fn naps(&self) -> &[Duration] {
        &self.naps
    }

    pub fn total(&self) -> Duration {
        self.naps.iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.naps.push(duration);
    }
}

/// Brings the wall clock to a trustworthy state.
pub trait TimeSync {
    fn sync(&mut self) -> Result<(), TimeSyncError>;
}

/// Trusts the host's own time service, but only once the clock has moved
/// past `floor`. A board without a battery-backed clock boots near the
/// epoch and stays there until the host has synchronized.
#[derive(Debug, Clone)]
pub struct PlausibleClock<C> {
    clock: C,
    floor: TimeInstant,
}

impl<C: Clock> PlausibleClock<C> {
    pub fn new(clock: C, floor: TimeInstant) -> Self {
        Self { clock, floor }
    }
}

impl<C: Clock> TimeSync for PlausibleClock<C> {
    fn sync(&mut self) -> Result<(), TimeSyncError> {
        let now = self.clock.now();
        if now < self.floor {
            return Err(TimeSyncError::Implausible {
                now,
                floor: self.floor,
            });
        }
        Ok(())
    }
}

/// Retry `sync` every `retry` until it succeeds, showing
/// [`DisplayState::TimeSyncError`] while it fails.
///
/// `max_attempts` of 0 retries forever. Returns the number of attempts made.
pub fn sync_clock<T, O, S>(
    sync: &mut T,
    outputs: &mut O,
    sleeper: &mut S,
    retry: Duration,
    max_attempts: u32,
) -> Result<u32, TimeSyncError>
where
    T: TimeSync + ?Sized,
    O: OutputLines + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match sync.sync() {
            Ok(()) => {
                info!(attempts, "clock synchronized");
                return Ok(attempts);
            }
            Err(e) => {
                outputs.set(DisplayState::TimeSyncError.pattern());
                warn!(attempts, "failed to synchronize clock: {e}. Retrying...");
                if max_attempts != 0 && attempts >= max_attempts {
                    return Err(TimeSyncError::Exhausted { attempts });
                }
                sleeper.sleep(retry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RecordingOutput;

    struct FixedClock(TimeInstant);

    impl Clock for FixedClock {
        fn now(&self) -> TimeInstant {
            self.0
        }
    }

    /// Fails a set number of times, then succeeds.
    struct Flaky {
        failures_left: u32,
    }

    impl TimeSync for Flaky {
        fn sync(&mut self) -> Result<(), TimeSyncError> {
            if self.failures_left == 0 {
                return Ok(());
            }
            self.failures_left -= 1;
            Err(TimeSyncError::Implausible {
                now: TimeInstant::from_unix_seconds(0),
                floor: TimeInstant::from_unix_seconds(1),
            })
        }
    }

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now().unix_seconds() > 1_577_836_800);
    }

    #[test]
    fn plausible_clock_rejects_time_before_floor() {
        let floor = TimeInstant::from_unix_seconds(1_000);
        let mut early = PlausibleClock::new(FixedClock(TimeInstant::from_unix_seconds(5)), floor);
        assert!(matches!(early.sync(), Err(TimeSyncError::Implausible { .. })));

        let mut late = PlausibleClock::new(FixedClock(TimeInstant::from_unix_seconds(2_000)), floor);
        assert!(late.sync().is_ok());
    }

    #[test]
    fn sync_retries_with_fixed_backoff() {
        let mut sync = Flaky { failures_left: 3 };
        let mut out = RecordingOutput::new();
        let mut sleeper = RecordingSleeper::default();

        let attempts =
            sync_clock(&mut sync, &mut out, &mut sleeper, Duration::from_secs(1), 0).unwrap();

        assert_eq!(attempts, 4);
        assert_eq!(sleeper.naps(), &[Duration::from_secs(1); 3]);
        assert_eq!(out.history(), &[DisplayState::TimeSyncError.pattern(); 3]);
    }

    #[test]
    fn sync_gives_up_after_max_attempts() {
        let mut sync = Flaky { failures_left: 10 };
        let mut out = RecordingOutput::new();
        let mut sleeper = RecordingSleeper::default();

        let err = sync_clock(&mut sync, &mut out, &mut sleeper, Duration::from_secs(1), 2)
            .unwrap_err();

        assert!(matches!(err, TimeSyncError::Exhausted { attempts: 2 }));
        assert_eq!(sleeper.naps().len(), 1);
    }

    #[test]
    fn first_try_success_shows_nothing() {
        let mut sync = Flaky { failures_left: 0 };
        let mut out = RecordingOutput::new();
        let mut sleeper = RecordingSleeper::default();
        assert_eq!(
            sync_clock(&mut sync, &mut out, &mut sleeper, Duration::from_secs(1), 0).unwrap(),
            1
        );
        assert!(out.history().is_empty());
    }
}
