use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Bucket {
    Minute,
    Hour,
    Day,
}

impl Bucket {
    pub fn step_seconds(self) -> i64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    pub fn truncate(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.step_seconds();
        let floored = ts.timestamp().div_euclid(step) * step;
        DateTime::from_timestamp(floored, 0).expect("floored timestamp in range")
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn parse_time_or_relative(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(duration) = humantime::parse_duration(input) {
        return Ok(Utc::now()
            - chrono::Duration::from_std(duration).map_err(|e| {
                TallyError::Parse(format!("failed to parse duration to chrono: {e}"))
            })?);
    }

    Err(TallyError::Parse(format!(
        "expected RFC3339 time or look-back duration, got {input}"
    )))
}

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| TallyError::Parse(format!("invalid duration {input}: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn truncates_to_minute() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 26, 10, 30, 59).unwrap();
        let want = Utc.with_ymd_and_hms(2026, 8, 26, 10, 30, 0).unwrap();
        assert_eq!(Bucket::Minute.truncate(ts), want);
    }

    #[test]
    fn truncates_to_hour_and_day() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 26, 10, 30, 59).unwrap();
        assert_eq!(
            Bucket::Hour.truncate(ts),
            Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap()
        );
        assert_eq!(
            Bucket::Day.truncate(ts),
            Utc.with_ymd_and_hms(2026, 8, 26, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn bucket_boundary_is_exact() {
        let start = Utc.with_ymd_and_hms(2026, 8, 26, 10, 30, 0).unwrap();
        assert_eq!(Bucket::Minute.truncate(start), start);

        let just_before = start - chrono::Duration::seconds(1);
        assert_eq!(
            Bucket::Minute.truncate(just_before),
            Utc.with_ymd_and_hms(2026, 8, 26, 10, 29, 0).unwrap()
        );
    }

    #[test]
    fn truncates_before_epoch() {
        let ts = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 30).unwrap();
        assert_eq!(
            Bucket::Day.truncate(ts),
            Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn fixed_clock_is_stable() {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn parses_rfc3339() {
        let ts = parse_time_or_relative("2026-01-01T00:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn parses_duration() {
        let now = Utc::now();
        let ts = parse_time_or_relative("5m").unwrap();
        assert!(ts < now);
    }

    #[test]
    fn rejects_invalid() {
        assert!(parse_time_or_relative("nope").is_err());
    }
}
