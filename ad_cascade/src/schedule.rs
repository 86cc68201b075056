//! Date range normalization for ad set schedules.
//!
//! Spreadsheet dates arrive in whatever format the author typed. A date is
//! tried against [`DATE_FORMATS`] in order and the first pattern that parses
//! wins; there is no further ambiguity resolution, so `03/04/2025` is always
//! the 3rd of April.
//!
//! The start of the interval is pinned to 00:01 and the end to 23:59 local wall
//! time in the target zone. Local wall times are resolved through a
//! [`DstPolicy`] so that zones with daylight saving behave deterministically:
//! - Ambiguous local times happen during "fall back" when a wall time occurs twice.
//! - Nonexistent local times happen during "spring forward" when a wall time is skipped.
//!
//! Examples
//! - `"01-03-2025"`..`"05-03-2025"` in Asia/Kolkata ->
//!   `2025-03-01T00:01:00+05:30`..`2025-03-05T23:59:00+05:30`

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

/// Accepted date patterns, in priority order.
pub const DATE_FORMATS: [&str; 6] = [
    "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y", "%Y-%m-%d", "%d-%m-%y", "%d/%m/%y",
];

/// Zone the platform account reports in unless configured otherwise.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("start date is missing")]
    MissingStart,
    #[error("end date is missing")]
    MissingEnd,
    #[error("start date {0:?} matches no known format")]
    UnrecognizedStart(String),
    #[error("end date {0:?} matches no known format")]
    UnrecognizedEnd(String),
    #[error("local time {0} cannot be resolved in {1}")]
    UnresolvableLocalTime(NaiveDateTime, Tz),
    #[error("end date {end} is before start date {start}")]
    Reversed { start: NaiveDate, end: NaiveDate },
}

/// Policy for handling DST edge cases when pinning local wall times.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Error on ambiguous (fall-back) or nonexistent (spring-forward) local times.
    #[default]
    Strict,
    /// For ambiguous local times pick the earlier instant.
    PreferEarliest,
    /// For ambiguous local times pick the later instant.
    PreferLatest,
    /// For nonexistent local times, step forward one minute at a time until a
    /// valid instant is found (capped at 2 hours).
    ShiftForward,
}

/// Resolve a naive local timestamp in `tz` according to `policy`.
///
/// Returns `None` when the time is ambiguous or nonexistent and the policy
/// does not resolve it.
pub fn resolve_local(naive: NaiveDateTime, tz: Tz, policy: DstPolicy) -> Option<DateTime<Tz>> {
    use chrono::offset::LocalResult::*;
    match tz.from_local_datetime(&naive) {
        Single(dt) => Some(dt),
        Ambiguous(a, b) => match policy {
            DstPolicy::PreferEarliest => Some(a),
            DstPolicy::PreferLatest => Some(b),
            _ => Option::None,
        },
        None => match policy {
            DstPolicy::ShiftForward => {
                let mut t = naive;
                for _ in 0..120 {
                    t += chrono::Duration::minutes(1);
                    if let Single(dt) = tz.from_local_datetime(&t) {
                        return Some(dt);
                    }
                }
                Option::None
            }
            _ => Option::None,
        },
    }
}

/// A validated, offset-qualified schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleInterval {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl ScheduleInterval {
    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn start_unix(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_unix(&self) -> i64 {
        self.end.timestamp()
    }

    /// Both ends as RFC-3339 strings with the zone offset, e.g. `+05:30`.
    pub fn to_rfc3339(&self) -> (String, String) {
        (self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DateRangeNormalizer {
    tz: Tz,
    policy: DstPolicy,
}

impl Default for DateRangeNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE, DstPolicy::Strict)
    }
}

impl DateRangeNormalizer {
    pub fn new(tz: Tz, policy: DstPolicy) -> Self {
        Self { tz, policy }
    }

    /// Normalize a pair of free-form date strings into a schedule.
    ///
    /// Either a full interval comes back or an error; never half of one.
    pub fn normalize(&self, start: &str, end: &str) -> Result<ScheduleInterval, DateParseError> {
        let start_date = match present(start) {
            Some(raw) => {
                parse_date(raw).ok_or_else(|| DateParseError::UnrecognizedStart(raw.to_string()))?
            }
            None => return Err(DateParseError::MissingStart),
        };
        let end_date = match present(end) {
            Some(raw) => {
                parse_date(raw).ok_or_else(|| DateParseError::UnrecognizedEnd(raw.to_string()))?
            }
            None => return Err(DateParseError::MissingEnd),
        };
        if end_date < start_date {
            return Err(DateParseError::Reversed {
                start: start_date,
                end: end_date,
            });
        }

        let start = self.pin(start_date.and_time(day_start()))?;
        let end = self.pin(end_date.and_time(day_end()))?;
        Ok(ScheduleInterval { start, end })
    }

    fn pin(&self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>, DateParseError> {
        resolve_local(naive, self.tz, self.policy)
            .map(|dt| dt.fixed_offset())
            .ok_or(DateParseError::UnresolvableLocalTime(naive, self.tz))
    }
}

/// Parse one date against [`DATE_FORMATS`], first match wins.
///
/// Four-digit-year patterns only accept four-digit years, so `05-03-24` falls
/// through to the two-digit-year patterns instead of landing in year 24.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(raw, fmt)
            .ok()
            .filter(|d| !fmt.contains("%Y") || (1000..=9999).contains(&d.year()))
    })
}

/// `None` for blank cells and the literal `nan` a dataframe export leaves behind.
fn present(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    (!raw.is_empty() && !raw.eq_ignore_ascii_case("nan")).then_some(raw)
}

fn day_start() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 1, 0).unwrap_or(NaiveTime::MIN)
}

fn day_end() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}
