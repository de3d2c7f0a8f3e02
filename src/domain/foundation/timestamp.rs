//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Combines a calendar date and wall-clock time, read as UTC.
    pub fn from_date_time(date: NaiveDate, time: NaiveTime) -> Self {
        Self(date.and_time(time).and_utc())
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Creates a new timestamp by subtracting the specified number of seconds.
    pub fn minus_secs(&self, secs: i64) -> Self {
        Self(self.0 - Duration::seconds(secs))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_date_time_reads_wall_clock_as_utc() {
        let date = NaiveDate::from_ymd_opt(2030, 3, 14).unwrap();
        let time = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let ts = Timestamp::from_date_time(date, time);
        assert_eq!(ts.as_datetime().to_rfc3339(), "2030-03-14T09:30:00+00:00");
    }

    #[test]
    fn plus_and_minus_secs_are_inverse() {
        let ts = Timestamp::now();
        assert_eq!(ts.plus_secs(90).minus_secs(90), ts);
        assert!(ts.plus_secs(1).is_after(&ts));
        assert!(ts.minus_secs(1).is_before(&ts));
    }

    #[test]
    fn duration_since_is_signed() {
        let ts = Timestamp::now();
        let later = ts.plus_secs(24 * 3600);
        assert_eq!(later.duration_since(&ts), Duration::days(1));
        assert_eq!(ts.duration_since(&later), Duration::days(-1));
    }

    #[test]
    fn serializes_as_rfc3339_string() {
        let date = NaiveDate::from_ymd_opt(2030, 1, 2).unwrap();
        let ts = Timestamp::from_date_time(date, NaiveTime::MIN);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2030-01-02T00:00:00Z\"");
    }
}
