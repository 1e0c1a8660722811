/// Time arithmetic for task accounting
///
/// Pure helpers used by the status state machine and the aggregation engine.
/// Nothing in here reads the system clock: every function that needs "now"
/// takes it as an argument, and the command layer samples it once through a
/// [`Clock`].
///
/// # Example
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use taskclock_shared::time::{elapsed, format_duration, TimeSpent};
///
/// let begin = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
/// let end = begin + Duration::hours(26) + Duration::minutes(5);
///
/// let ms = elapsed(Some(begin), Some(end)).unwrap();
/// assert_eq!(format_duration(ms), TimeSpent { days: 1, hours: 2, minutes: 5 });
/// ```

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

/// Milliseconds in one minute
pub const MS_PER_MINUTE: i64 = 60_000;

/// Milliseconds in one hour
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// Milliseconds in one day
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Error type for interval computations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    /// One of the interval endpoints is missing
    #[error("Invalid interval: {0} is not set")]
    InvalidInterval(&'static str),
}

/// Returns the absolute distance between two instants in milliseconds
///
/// # Errors
///
/// Returns `TimeError::InvalidInterval` if either endpoint is `None`.
pub fn elapsed(
    begin: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<i64, TimeError> {
    let begin = begin.ok_or(TimeError::InvalidInterval("begin"))?;
    let end = end.ok_or(TimeError::InvalidInterval("end"))?;

    Ok((end - begin).num_milliseconds().abs())
}

/// Human-facing breakdown of a duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpent {
    /// Whole days
    pub days: i64,

    /// Remaining whole hours (0..24)
    pub hours: i64,

    /// Remaining whole minutes (0..60)
    pub minutes: i64,
}

/// Splits a millisecond count into days, hours and minutes
///
/// Truncates at every step; seconds are dropped. Negative input is treated
/// as zero.
pub fn format_duration(ms: i64) -> TimeSpent {
    let ms = ms.max(0);

    TimeSpent {
        days: ms / MS_PER_DAY,
        hours: (ms % MS_PER_DAY) / MS_PER_HOUR,
        minutes: (ms % MS_PER_HOUR) / MS_PER_MINUTE,
    }
}

/// Trailing window used to restrict time reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    /// Last 7 days
    Week,

    /// Last calendar month
    Month,

    /// Last 24 hours
    Hour,
}

impl TimeFilter {
    /// Returns the filter token as accepted on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Hour => "hour",
        }
    }

    /// Start of the window ending at `now`
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeFilter::Week => now - Duration::days(7),
            // Falls back to 31 days only for dates chrono cannot represent
            TimeFilter::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or_else(|| now - Duration::days(31)),
            TimeFilter::Hour => now - Duration::hours(24),
        }
    }

    /// Start of the window for an optional filter; `None` means unbounded
    pub fn window_start(filter: Option<TimeFilter>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        filter.map(|f| f.start(now))
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(TimeFilter::Week),
            "month" => Ok(TimeFilter::Month),
            "hour" => Ok(TimeFilter::Hour),
            other => Err(format!(
                "Unknown time filter '{}': expected one of week, month, hour",
                other
            )),
        }
    }
}

/// Source of the current instant
///
/// Commands sample the clock once and pass the value down, so every timestamp
/// written by one command agrees with every duration it computes.
pub trait Clock: Send + Sync {
    /// Returns the current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Moves the clock to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Moves the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_elapsed_is_absolute() {
        let a = at(1, 10);
        let b = at(1, 12);

        assert_eq!(elapsed(Some(a), Some(b)).unwrap(), 2 * MS_PER_HOUR);
        assert_eq!(elapsed(Some(b), Some(a)).unwrap(), 2 * MS_PER_HOUR);
        assert_eq!(elapsed(Some(a), Some(a)).unwrap(), 0);
    }

    #[test]
    fn test_elapsed_missing_endpoint() {
        assert_eq!(
            elapsed(None, Some(at(1, 0))),
            Err(TimeError::InvalidInterval("begin"))
        );
        assert_eq!(
            elapsed(Some(at(1, 0)), None),
            Err(TimeError::InvalidInterval("end"))
        );
    }

    #[test]
    fn test_format_duration_zero() {
        assert_eq!(format_duration(0), TimeSpent::default());
    }

    #[test]
    fn test_format_duration_truncates() {
        // 2d 3h 4m 59s 999ms
        let ms = 2 * MS_PER_DAY + 3 * MS_PER_HOUR + 4 * MS_PER_MINUTE + 59_999;
        assert_eq!(
            format_duration(ms),
            TimeSpent {
                days: 2,
                hours: 3,
                minutes: 4
            }
        );

        assert_eq!(format_duration(MS_PER_MINUTE - 1), TimeSpent::default());
        assert_eq!(format_duration(-5), TimeSpent::default());
    }

    #[test]
    fn test_time_filter_parse() {
        assert_eq!("week".parse::<TimeFilter>(), Ok(TimeFilter::Week));
        assert_eq!("month".parse::<TimeFilter>(), Ok(TimeFilter::Month));
        assert_eq!("hour".parse::<TimeFilter>(), Ok(TimeFilter::Hour));
        assert!("Week".parse::<TimeFilter>().is_err());
        assert!("day".parse::<TimeFilter>().is_err());

        let parsed: TimeFilter = serde_json::from_str("\"month\"").unwrap();
        assert_eq!(parsed, TimeFilter::Month);
    }

    #[test]
    fn test_time_filter_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();

        assert_eq!(TimeFilter::Week.start(now), now - Duration::days(7));
        assert_eq!(TimeFilter::Hour.start(now), now - Duration::hours(24));
        // Calendar month, clamped to the last day of February
        assert_eq!(
            TimeFilter::Month.start(now),
            Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap()
        );
        assert_eq!(TimeFilter::window_start(None, now), None);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(at(1, 0));
        assert_eq!(clock.now(), at(1, 0));

        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), at(1, 3));

        clock.set(at(2, 0));
        assert_eq!(clock.now(), at(2, 0));
    }
}
