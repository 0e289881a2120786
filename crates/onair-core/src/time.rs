//! Absolute instants with second resolution.
//!
//! [`TimeInstant`] is a count of seconds since the Unix epoch, always UTC.
//! Conversion to and from civil (year, month, day, hour, minute, second)
//! timestamps uses the proleptic Gregorian day-count algorithms, so no
//! calendar library is needed to compare schedule times.

use std::fmt;
use std::ops::Add;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Days between 0000-03-01 and 1970-01-01.
const EPOCH_DAY_OFFSET: i64 = 719_468;
const DAYS_PER_ERA: i64 = 146_097;
const SECONDS_PER_DAY: i64 = 86_400;

/// A point in time, in whole seconds since 1970-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeInstant(i64);

/// Broken-down UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Why a schedule timestamp string was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("expected '{expected}' at offset {offset}")]
    BadSeparator { offset: usize, expected: char },

    #[error("non-digit at offset {offset}")]
    NotDigit { offset: usize },

    #[error("{field} out of range")]
    OutOfRange { field: &'static str },
}

impl CivilTime {
    pub fn new(year: i32, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Check every field against its calendar range.
    pub fn validate(&self) -> Result<(), TimestampError> {
        if !(1..=12).contains(&self.month) {
            return Err(TimestampError::OutOfRange { field: "month" });
        }
        if self.day == 0 || self.day > days_in_month(self.year, self.month) {
            return Err(TimestampError::OutOfRange { field: "day" });
        }
        if self.hour > 23 {
            return Err(TimestampError::OutOfRange { field: "hour" });
        }
        if self.minute > 59 {
            return Err(TimestampError::OutOfRange { field: "minute" });
        }
        if self.second > 59 {
            return Err(TimestampError::OutOfRange { field: "second" });
        }
        Ok(())
    }
}

impl TimeInstant {
    pub const fn from_unix_seconds(secs: i64) -> Self {
        Self(secs)
    }

    pub const fn unix_seconds(self) -> i64 {
        self.0
    }

    /// Build an instant from a civil UTC timestamp.
    ///
    /// The fields are not range-checked; call [`CivilTime::validate`] first
    /// when the input is untrusted.
    pub fn from_civil(civil: CivilTime) -> Self {
        let days = days_from_civil(civil.year as i64, civil.month as i64, civil.day as i64);
        let secs = civil.hour as i64 * 3600 + civil.minute as i64 * 60 + civil.second as i64;
        Self(days * SECONDS_PER_DAY + secs)
    }

    pub fn to_civil(self) -> CivilTime {
        let days = self.0.div_euclid(SECONDS_PER_DAY);
        let secs = self.0.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);
        CivilTime {
            year: year as i32,
            month: month as u8,
            day: day as u8,
            hour: (secs / 3600) as u8,
            minute: (secs % 3600 / 60) as u8,
            second: (secs % 60) as u8,
        }
    }

    /// Parse the schedule wire format `YYYY-MM-DDThh:mm:ss.sssZ`.
    ///
    /// Fields live at fixed byte offsets. Separators must match exactly and
    /// the milliseconds must be digits, but they are otherwise ignored.
    pub fn parse_schedule_timestamp(s: &str) -> Result<Self, TimestampError> {
        const LAYOUT: &[u8; 24] = b"dddd-dd-ddTdd:dd:dd.dddZ";

        let bytes = s.as_bytes();
        if bytes.len() != LAYOUT.len() {
            return Err(TimestampError::WrongLength {
                expected: LAYOUT.len(),
                actual: bytes.len(),
            });
        }
        for (offset, (&b, &want)) in bytes.iter().zip(LAYOUT.iter()).enumerate() {
            if want == b'd' {
                if !b.is_ascii_digit() {
                    return Err(TimestampError::NotDigit { offset });
                }
            } else if b != want {
                return Err(TimestampError::BadSeparator {
                    offset,
                    expected: want as char,
                });
            }
        }

        let civil = CivilTime {
            year: digits(bytes, 0, 4) as i32,
            month: digits(bytes, 5, 2) as u8,
            day: digits(bytes, 8, 2) as u8,
            hour: digits(bytes, 11, 2) as u8,
            minute: digits(bytes, 14, 2) as u8,
            second: digits(bytes, 17, 2) as u8,
        };
        civil.validate()?;
        Ok(Self::from_civil(civil))
    }

    /// `YYYYMMDD` of the UTC calendar day containing this instant.
    pub fn date_key(self) -> String {
        let c = self.to_civil();
        format!("{:04}{:02}{:02}", c.year, c.month, c.day)
    }

    /// Signed number of seconds from `earlier` to `self`.
    pub fn seconds_since(self, earlier: TimeInstant) -> i64 {
        self.0 - earlier.0
    }

    /// Elapsed time since `earlier`, zero if `earlier` is in the future.
    pub fn elapsed_since(self, earlier: TimeInstant) -> Duration {
        Duration::from_secs(self.seconds_since(earlier).max(0) as u64)
    }
}

impl Add<Duration> for TimeInstant {
    type Output = TimeInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        let secs = i64::try_from(rhs.as_secs()).unwrap_or(i64::MAX);
        TimeInstant(self.0.saturating_add(secs))
    }
}

impl From<DateTime<Utc>> for TimeInstant {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.to_civil();
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            c.year, c.month, c.day, c.hour, c.minute, c.second
        )
    }
}

impl Serialize for TimeInstant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn digits(bytes: &[u8], start: usize, len: usize) -> u32 {
    bytes[start..start + len]
        .iter()
        .fold(0, |acc, b| acc * 10 + (b - b'0') as u32)
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    // Shift the year to start in March so the leap day is last.
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * DAYS_PER_ERA + doe - EPOCH_DAY_OFFSET
}

fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + EPOCH_DAY_OFFSET;
    let era = z.div_euclid(DAYS_PER_ERA);
    let doe = z.rem_euclid(DAYS_PER_ERA);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + if month <= 2 { 1 } else { 0 };
    (year, month, day)
}
