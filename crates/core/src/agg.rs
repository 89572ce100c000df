use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::model::metric::{CalcType, Metric};
use crate::time::{Bucket, Clock, SystemClock};

pub trait PointStore {
    fn bucket_aggregate(
        &self,
        metric_id: i64,
        bucket: Bucket,
        bucket_start: DateTime<Utc>,
        calc_type: CalcType,
    ) -> Result<Option<f64>>;
}

pub struct Aggregator<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: PointStore> Aggregator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: SystemClock,
        }
    }
}

impl<S: PointStore, C: Clock> Aggregator<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn points_last_hour(&self, metric: &Metric, hours_ago: u32, minutes_ago: u32) -> Result<f64> {
        let anchor = self.clock.now()
            - Duration::hours(i64::from(hours_ago))
            - Duration::minutes(i64::from(minutes_ago));
        self.bucket_value(metric, Bucket::Minute, anchor)
    }

    pub fn points_by_hour(&self, metric: &Metric, hours_ago: u32) -> Result<f64> {
        let anchor = self.clock.now() - Duration::hours(i64::from(hours_ago));
        self.bucket_value(metric, Bucket::Hour, anchor)
    }

    pub fn points_for_day_in_week(&self, metric: &Metric, days_ago: u32) -> Result<f64> {
        let anchor = self.clock.now() - Duration::days(i64::from(days_ago));
        self.bucket_value(metric, Bucket::Day, anchor)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn bucket_value(&self, metric: &Metric, bucket: Bucket, anchor: DateTime<Utc>) -> Result<f64> {
        let raw = self
            .store
            .bucket_aggregate(metric.id, bucket, bucket.truncate(anchor), metric.calc_type)?
            .unwrap_or(0.0);
        let resolved = zero_falls_back_to_default(raw, metric.default_value);
        Ok(round_to_places(resolved, metric.places))
    }
}

pub fn zero_falls_back_to_default(aggregate: f64, default_value: f64) -> f64 {
    if aggregate == 0.0 && default_value != 0.0 {
        default_value
    } else {
        aggregate
    }
}

pub fn round_to_places(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
