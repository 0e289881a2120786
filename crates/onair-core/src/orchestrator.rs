//! Refresh orchestration.
//!
//! The orchestrator is a polled state machine. It does not use internal
//! threads or timers: the caller hands it the current instant through
//! [`Orchestrator::tick`] and it decides whether the schedule or the
//! display is due.
//!
//! ## Cadences
//!
//! ```text
//! schedule: fetch -> extract -> decode -> replace window   (long interval)
//! display:  classify(window, now) -> outputs               (short interval)
//! ```
//!
//! The display cadence stays idle until the first schedule refresh has
//! succeeded. A failed refresh shows its error state, keeps the previous
//! window, and is retried after the interval configured for its error
//! class.
//!
//! ## Usage
//!
//! ```ignore
//! let mut orch = Orchestrator::new(source, outputs, RefreshSettings::from(&config));
//! orch.run(&SystemClock, &mut ThreadSleeper);
//! ```

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::clock::{Clock, Sleeper};
use crate::config::Config;
use crate::decode::{decode_document, MUSIC_CATEGORY};
use crate::error::RefreshError;
use crate::extract::{extract_with_chunk_size, DEFAULT_CHUNK_SIZE, END_SENTINEL, START_SENTINEL};
use crate::output::OutputLines;
use crate::source::ScheduleSource;
use crate::status::{classify, DisplayState, DEFAULT_SOON_HORIZON};
use crate::time::TimeInstant;
use crate::window::ScheduleWindow;

/// Cadences, retry intervals and decoding parameters.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub schedule_interval: Duration,
    pub display_interval: Duration,
    pub soon_horizon: Duration,
    pub poll_interval: Duration,
    /// Delay before retrying after a transport failure.
    pub connectivity_retry: Duration,
    /// Delay before retrying after a content failure.
    pub decode_retry: Duration,
    pub category: String,
    pub chunk_size: usize,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            schedule_interval: Duration::from_secs(3600),
            display_interval: Duration::from_secs(10),
            soon_horizon: DEFAULT_SOON_HORIZON,
            poll_interval: Duration::from_secs(1),
            connectivity_retry: Duration::from_secs(60),
            decode_retry: Duration::from_secs(3600),
            category: MUSIC_CATEGORY.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl From<&Config> for RefreshSettings {
    fn from(config: &Config) -> Self {
        Self {
            schedule_interval: config.timing.schedule_interval(),
            display_interval: config.timing.display_interval(),
            soon_horizon: config.timing.soon_horizon(),
            poll_interval: config.timing.poll_interval(),
            connectivity_retry: config.timing.connectivity_retry(),
            decode_retry: config.timing.decode_retry(),
            category: config.fetch.category.clone(),
            chunk_size: config.fetch.chunk_size,
        }
    }
}

/// Everything the two cadences share.
#[derive(Debug, Clone, Default)]
pub struct RefreshState {
    /// Latest successfully decoded window; `None` until the first success.
    window: Option<ScheduleWindow>,
    last_schedule_refresh: Option<TimeInstant>,
    next_schedule_attempt: Option<TimeInstant>,
    last_display_refresh: Option<TimeInstant>,
    displayed: Option<DisplayState>,
    consecutive_failures: u32,
}

impl RefreshState {
    pub fn window(&self) -> Option<&ScheduleWindow> {
        self.window.as_ref()
    }

    pub fn last_schedule_refresh(&self) -> Option<TimeInstant> {
        self.last_schedule_refresh
    }

    pub fn next_schedule_attempt(&self) -> Option<TimeInstant> {
        self.next_schedule_attempt
    }

    pub fn last_display_refresh(&self) -> Option<TimeInstant> {
        self.last_display_refresh
    }

    /// State currently on the outputs.
    pub fn displayed(&self) -> Option<DisplayState> {
        self.displayed
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// How a schedule refresh ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Updated {
        date: String,
        airings: usize,
    },
    Failed {
        date: String,
        state: DisplayState,
        error: String,
        retry_at: TimeInstant,
    },
}

/// What one [`Orchestrator::tick`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Set if a schedule refresh ran.
    pub refresh: Option<RefreshOutcome>,
    /// Set if the display cadence ran.
    pub display: Option<DisplayState>,
}

/// Drives the indicator from a schedule source to the output lines.
pub struct Orchestrator<S, O> {
    source: S,
    outputs: O,
    settings: RefreshSettings,
    state: RefreshState,
}

impl<S: ScheduleSource, O: OutputLines> Orchestrator<S, O> {
    pub fn new(source: S, outputs: O, settings: RefreshSettings) -> Self {
        Self {
            source,
            outputs,
            settings,
            state: RefreshState::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    /// Whether a schedule refresh is due at `now`.
    pub fn schedule_due(&self, now: TimeInstant) -> bool {
        self.state.next_schedule_attempt.map_or(true, |due| now >= due)
    }

    /// Whether the display should be refreshed at `now`.
    pub fn display_due(&self, now: TimeInstant) -> bool {
        self.state.window.is_some()
            && self
                .state
                .last_display_refresh
                .map_or(true, |last| now.elapsed_since(last) >= self.settings.display_interval)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Call periodically with the current instant.
    ///
    /// A failed refresh shows its error pattern, but when a window is still
    /// held and the display is due, the same tick classifies against that
    /// window and replaces the error pattern straight away.
    pub fn tick(&mut self, now: TimeInstant) -> TickReport {
        let mut report = TickReport::default();
        if self.schedule_due(now) {
            report.refresh = Some(self.refresh_schedule(now));
        }
        if self.display_due(now) {
            report.display = self.refresh_display(now);
        }
        report
    }

    /// Fetch and decode the schedule for the UTC day containing `now`.
    pub fn refresh_schedule(&mut self, now: TimeInstant) -> RefreshOutcome {
        let date = now.date_key();
        info!(%date, "refreshing schedule");

        match self.fetch_window(&date) {
            Ok(window) => {
                let airings = window.len();
                info!(%date, airings, "schedule refreshed");
                self.state.window = Some(window);
                self.state.last_schedule_refresh = Some(now);
                self.state.next_schedule_attempt = Some(now + self.settings.schedule_interval);
                self.state.consecutive_failures = 0;
                RefreshOutcome::Updated { date, airings }
            }
            Err(e) => {
                let state = e.display_state();
                let retry = match state {
                    DisplayState::ConnectivityError => self.settings.connectivity_retry,
                    _ => self.settings.decode_retry,
                };
                let retry_at = now + retry;
                self.state.next_schedule_attempt = Some(retry_at);
                self.state.consecutive_failures += 1;
                warn!(
                    %date,
                    %state,
                    %retry_at,
                    failures = self.state.consecutive_failures,
                    "schedule refresh failed: {e}"
                );
                self.show(state);
                RefreshOutcome::Failed {
                    date,
                    state,
                    error: e.to_string(),
                    retry_at,
                }
            }
        }
    }

    /// Classify `now` against the held window and show the result.
    ///
    /// Returns `None` while no schedule has been loaded.
    pub fn refresh_display(&mut self, now: TimeInstant) -> Option<DisplayState> {
        let window = self.state.window.as_ref()?;
        let state = classify(window, now, self.settings.soon_horizon);
        self.state.last_display_refresh = Some(now);
        self.show(state);
        Some(state)
    }

    /// Poll forever, sleeping `poll_interval` between ticks.
    pub fn run<C, Z>(&mut self, clock: &C, sleeper: &mut Z) -> !
    where
        C: Clock + ?Sized,
        Z: Sleeper + ?Sized,
    {
        loop {
            self.tick(clock.now());
            sleeper.sleep(self.settings.poll_interval);
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fetch_window(&mut self, date_key: &str) -> Result<ScheduleWindow, RefreshError> {
        let stream = self.source.open(date_key)?;
        let payload =
            extract_with_chunk_size(stream, START_SENTINEL, END_SENTINEL, self.settings.chunk_size)?;
        Ok(decode_document(&payload, &self.settings.category)?)
    }

    /// Write `state` to the outputs if it differs from what is shown.
    fn show(&mut self, state: DisplayState) {
        if self.state.displayed == Some(state) {
            return;
        }
        info!(%state, pattern = %state.pattern(), "display changed");
        self.outputs.set(state.pattern());
        self.state.displayed = Some(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::output::RecordingOutput;
    use crate::time::CivilTime;
    use std::collections::VecDeque;
    use std::io::{Cursor, Read};

    /// Serves queued responses, one per `open`.
    #[derive(Default)]
    struct Scripted {
        responses: VecDeque<Result<String, u16>>,
        requested: Vec<String>,
    }

    impl ScheduleSource for Scripted {
        fn open(&mut self, date_key: &str) -> Result<Box<dyn Read>, SourceError> {
            self.requested.push(date_key.to_string());
            match self.responses.pop_front() {
                Some(Ok(body)) => Ok(Box::new(Cursor::new(body.into_bytes()))),
                Some(Err(status)) => Err(SourceError::Status {
                    url: format!("test://{date_key}"),
                    status,
                }),
                None => Err(SourceError::Status {
                    url: format!("test://{date_key}"),
                    status: 599,
                }),
            }
        }
    }

    fn at(hour: u8, minute: u8) -> TimeInstant {
        TimeInstant::from_civil(CivilTime::new(2025, 10, 12, hour, minute, 0))
    }

    fn page(airings: &[(&str, &str)]) -> String {
        let items: Vec<String> = airings
            .iter()
            .map(|(start, end)| {
                format!(
                    r#"{{"props":{{"label":"Music"}},"meta":{{"scheduledStart":"2025-10-12T{start}:00.000Z","scheduledEnd":"2025-10-12T{end}:00.000Z"}}}}"#
                )
            })
            .collect();
        format!(
            r#"<html><script>window.__PARAMS__ = {{"navigation":{{}},"schedule":{{"items":[{}]}}}};</script></html>"#,
            items.join(",")
        )
    }

    fn orchestrator(
        responses: Vec<Result<String, u16>>,
    ) -> Orchestrator<Scripted, RecordingOutput> {
        let source = Scripted {
            responses: responses.into(),
            ..Scripted::default()
        };
        let settings = RefreshSettings {
            chunk_size: 64,
            ..RefreshSettings::default()
        };
        Orchestrator::new(source, RecordingOutput::new(), settings)
    }

    #[test]
    fn first_tick_refreshes_and_displays() {
        let mut orch = orchestrator(vec![Ok(page(&[("10:00", "10:30")]))]);
        let report = orch.tick(at(10, 10));

        assert_eq!(
            report.refresh,
            Some(RefreshOutcome::Updated {
                date: "20251012".into(),
                airings: 1
            })
        );
        assert_eq!(report.display, Some(DisplayState::Now));
        assert_eq!(orch.outputs().last(), Some(DisplayState::Now.pattern()));
        assert_eq!(orch.source.requested, vec!["20251012"]);
    }

    #[test]
    fn display_waits_for_first_successful_refresh() {
        let mut orch = orchestrator(vec![Err(503)]);
        let report = orch.tick(at(10, 0));

        assert!(matches!(
            report.refresh,
            Some(RefreshOutcome::Failed {
                state: DisplayState::ConnectivityError,
                ..
            })
        ));
        assert_eq!(report.display, None);
        assert!(!orch.display_due(at(10, 5)));
        assert_eq!(orch.outputs().history(), &[DisplayState::ConnectivityError.pattern()]);
    }

    #[test]
    fn empty_schedule_shows_never() {
        let mut orch = orchestrator(vec![Ok(page(&[]))]);
        assert_eq!(orch.tick(at(10, 0)).display, Some(DisplayState::Never));
    }

    #[test]
    fn cadences_follow_their_intervals() {
        let mut orch = orchestrator(vec![
            Ok(page(&[("10:00", "10:30")])),
            Ok(page(&[("10:00", "10:30")])),
        ]);
        orch.tick(at(9, 0));

        // Display interval is 10 s, schedule interval 1 h.
        let quiet = orch.tick(at(9, 0) + Duration::from_secs(5));
        assert_eq!(quiet, TickReport::default());

        let display_only = orch.tick(at(9, 0) + Duration::from_secs(10));
        assert_eq!(display_only.refresh, None);
        assert_eq!(display_only.display, Some(DisplayState::Soon));

        let both = orch.tick(at(10, 0));
        assert!(matches!(both.refresh, Some(RefreshOutcome::Updated { .. })));
        assert_eq!(both.display, Some(DisplayState::Now));
    }

    #[test]
    fn failed_refresh_keeps_previous_window() {
        let mut orch = orchestrator(vec![Ok(page(&[("10:00", "10:30")])), Ok("<html></html>".into())]);
        orch.tick(at(10, 5));
        let before = orch.state().window().cloned();

        let report = orch.tick(at(11, 5));
        assert!(matches!(
            report.refresh,
            Some(RefreshOutcome::Failed {
                state: DisplayState::DecodeError,
                ..
            })
        ));
        assert_eq!(orch.state().window().cloned(), before);
        assert_eq!(orch.state().last_schedule_refresh(), Some(at(10, 5)));

        // The same tick still classifies against the old data.
        assert_eq!(report.display, Some(DisplayState::Never));
        let shown: Vec<String> = orch.outputs().history().iter().map(ToString::to_string).collect();
        assert_eq!(shown, vec!["1000", "0110", "0001"]);
    }

    #[test]
    fn retry_interval_depends_on_error_class() {
        let mut orch = orchestrator(vec![Err(500), Ok("no sentinels".into())]);

        orch.tick(at(8, 0));
        assert_eq!(orch.state().next_schedule_attempt(), Some(at(8, 1)));
        assert!(!orch.schedule_due(at(8, 0) + Duration::from_secs(59)));

        let report = orch.tick(at(8, 1));
        assert!(matches!(
            report.refresh,
            Some(RefreshOutcome::Failed {
                state: DisplayState::DecodeError,
                ..
            })
        ));
        assert_eq!(orch.state().next_schedule_attempt(), Some(at(9, 1)));
        assert_eq!(orch.state().consecutive_failures(), 2);
    }

    #[test]
    fn success_resets_failure_count() {
        let mut orch = orchestrator(vec![Err(500), Ok(page(&[]))]);
        orch.tick(at(8, 0));
        orch.tick(at(8, 1));
        assert_eq!(orch.state().consecutive_failures(), 0);
        assert_eq!(orch.state().next_schedule_attempt(), Some(at(9, 1)));
    }

    #[test]
    fn unchanged_state_is_not_rewritten() {
        let mut orch = orchestrator(vec![Ok(page(&[("10:00", "10:30")]))]);
        orch.tick(at(10, 0));
        orch.tick(at(10, 1));
        orch.tick(at(10, 2));
        assert_eq!(orch.outputs().history().len(), 1);
    }

    #[test]
    fn date_key_follows_utc_day() {
        let mut orch = orchestrator(vec![Ok(page(&[])), Ok(page(&[]))]);
        orch.tick(TimeInstant::from_civil(CivilTime::new(2025, 12, 31, 23, 30, 0)));
        orch.tick(TimeInstant::from_civil(CivilTime::new(2026, 1, 1, 0, 30, 0)));
        assert_eq!(orch.source.requested, vec!["20251231", "20260101"]);
    }
}
