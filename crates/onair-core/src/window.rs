//! Airing intervals and the per-day collection of them.

use serde::Serialize;

use crate::error::ValidationError;
use crate::time::TimeInstant;

/// A closed time window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    start: TimeInstant,
    end: TimeInstant,
}

impl Interval {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimeRange`] if `end` precedes `start`.
    pub fn new(start: TimeInstant, end: TimeInstant) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> TimeInstant {
        self.start
    }

    pub fn end(&self) -> TimeInstant {
        self.end
    }

    pub fn contains(&self, t: TimeInstant) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Intervals of one schedule document, in document order.
///
/// The order is not sorted by start time; classification depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScheduleWindow {
    intervals: Vec<Interval>,
}

impl ScheduleWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interval: Interval) {
        self.intervals.push(interval);
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval> {
        self.intervals.iter()
    }
}

impl From<Vec<Interval>> for ScheduleWindow {
    fn from(intervals: Vec<Interval>) -> Self {
        Self { intervals }
    }
}

impl<'a> IntoIterator for &'a ScheduleWindow {
    type Item = &'a Interval;
    type IntoIter = std::slice::Iter<'a, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}
