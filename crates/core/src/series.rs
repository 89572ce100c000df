use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::agg::{Aggregator, PointStore};
use crate::error::Result;
use crate::model::metric::Metric;
use crate::time::{Bucket, Clock};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub bucket: DateTime<Utc>,
    pub label: String,
    pub value: f64,
}

impl<S: PointStore, C: Clock> Aggregator<S, C> {
    pub fn series_last_hour(&self, metric: &Metric) -> Result<Vec<SeriesPoint>> {
        let now = self.now();
        let mut out = Vec::with_capacity(61);
        for minutes_ago in (0..=60u32).rev() {
            let bucket = Bucket::Minute.truncate(now - Duration::minutes(i64::from(minutes_ago)));
            out.push(SeriesPoint {
                bucket,
                label: bucket.format("%H:%M").to_string(),
                value: self.points_last_hour(metric, 0, minutes_ago)?,
            });
        }
        Ok(out)
    }

    pub fn series_last_hours(&self, metric: &Metric, hours: u32) -> Result<Vec<SeriesPoint>> {
        let now = self.now();
        let mut out = Vec::with_capacity(hours as usize + 1);
        for hours_ago in (0..=hours).rev() {
            let bucket = Bucket::Hour.truncate(now - Duration::hours(i64::from(hours_ago)));
            out.push(SeriesPoint {
                bucket,
                label: bucket.format("%H:00").to_string(),
                value: self.points_by_hour(metric, hours_ago)?,
            });
        }
        Ok(out)
    }

    pub fn series_week(&self, metric: &Metric) -> Result<Vec<SeriesPoint>> {
        let now = self.now();
        let mut out = Vec::with_capacity(7);
        for days_ago in (0..=6u32).rev() {
            let bucket = Bucket::Day.truncate(now - Duration::days(i64::from(days_ago)));
            out.push(SeriesPoint {
                bucket,
                label: bucket.format("%a %-d %b").to_string(),
                value: self.points_for_day_in_week(metric, days_ago)?,
            });
        }
        Ok(out)
    }
}
