use chrono::{DateTime, Duration, TimeZone, Utc};
use tally_core::model::metric::{CalcType, NewMetric};
use tally_core::model::point::MetricPoint;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 12, 30, 0).unwrap()
}

pub fn sample_metric(calc_type: CalcType) -> NewMetric {
    NewMetric {
        name: "http_error_rate".to_string(),
        suffix: "errors".to_string(),
        description: "Errors returned by the edge per interval".to_string(),
        calc_type,
        default_value: 0.0,
        places: 0,
    }
}

pub fn point_at(metric_id: i64, value: f64, counter: i64, created_at: DateTime<Utc>) -> MetricPoint {
    MetricPoint {
        metric_id,
        value,
        counter,
        created_at,
    }
}

pub fn minute_burst(metric_id: i64, start: DateTime<Utc>, samples: &[(f64, i64)]) -> Vec<MetricPoint> {
    samples
        .iter()
        .enumerate()
        .map(|(i, (value, counter))| MetricPoint {
            metric_id,
            value: *value,
            counter: *counter,
            created_at: start + Duration::seconds(i as i64),
        })
        .collect()
}
