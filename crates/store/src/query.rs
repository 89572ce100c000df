use chrono::{DateTime, Utc};
use duckdb::params;
use tally_core::agg::PointStore;
use tally_core::error::{Result, TallyError};
use tally_core::model::metric::{CalcType, Metric};
use tally_core::time::Bucket;

use crate::Store;

impl Store {
    pub fn get_metric(&self, id: i64) -> Result<Option<Metric>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, suffix, description, calc_type, default_value, places
                 FROM metrics
                 WHERE id = ?",
            )
            .map_err(|e| TallyError::Store(format!("prepare metric lookup failed: {e}")))?;

        let mut rows = stmt
            .query_map(params![id], read_metric_row)
            .map_err(|e| TallyError::Store(format!("query metric failed: {e}")))?;

        match rows.next() {
            Some(row) => Ok(Some(
                row.map_err(|e| TallyError::Store(format!("map metric row failed: {e}")))?,
            )),
            None => Ok(None),
        }
    }

    pub fn list_metrics(&self) -> Result<Vec<Metric>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, suffix, description, calc_type, default_value, places
                 FROM metrics
                 ORDER BY id ASC",
            )
            .map_err(|e| TallyError::Store(format!("prepare metric list failed: {e}")))?;

        let rows = stmt
            .query_map([], read_metric_row)
            .map_err(|e| TallyError::Store(format!("query metrics failed: {e}")))?;

        let mut metrics = Vec::new();
        for row in rows {
            metrics
                .push(row.map_err(|e| TallyError::Store(format!("map metric row failed: {e}")))?);
        }
        Ok(metrics)
    }
}

impl PointStore for Store {
    fn bucket_aggregate(
        &self,
        metric_id: i64,
        bucket: Bucket,
        bucket_start: DateTime<Utc>,
        calc_type: CalcType,
    ) -> Result<Option<f64>> {
        let agg_expr = match calc_type {
            CalcType::Sum => "sum(p.value * p.counter)",
            CalcType::Avg => "avg(p.value * p.counter)",
        };
        let sql = format!(
            "SELECT {agg_expr}
             FROM metrics m
             JOIN metric_points p ON p.metric_id = m.id
             WHERE m.id = ? AND date_trunc('{}', p.created_at) = ?",
            trunc_unit(bucket)
        );

        let conn = self.conn();
        conn.query_row(&sql, params![metric_id, bucket_start.to_rfc3339()], |row| {
            row.get::<_, Option<f64>>(0)
        })
        .map_err(|e| TallyError::Store(format!("bucket aggregate failed: {e}")))
    }
}

fn trunc_unit(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Minute => "minute",
        Bucket::Hour => "hour",
        Bucket::Day => "day",
    }
}

fn read_metric_row(row: &duckdb::Row<'_>) -> duckdb::Result<Metric> {
    Ok(Metric {
        id: row.get::<_, i64>(0)?,
        name: row.get::<_, String>(1)?,
        suffix: row.get::<_, String>(2)?,
        description: row.get::<_, String>(3)?,
        calc_type: CalcType::from_stored(row.get::<_, i64>(4)?),
        default_value: row.get::<_, f64>(5)?,
        places: row.get::<_, i64>(6)?.max(0) as u32,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tally_core::agg::PointStore;
    use tally_core::model::metric::CalcType;
    use tally_core::time::Bucket;
    use testkit::{base_time, minute_burst, point_at, sample_metric};

    use crate::Store;

    #[test]
    fn round_trips_metric_definition() {
        let store = Store::open_in_memory().unwrap();
        let metric = store.insert_metric(&sample_metric(CalcType::Avg)).unwrap();

        let found = store.get_metric(metric.id).unwrap().unwrap();
        assert_eq!(found, metric);
        assert!(store.get_metric(metric.id + 100).unwrap().is_none());
    }

    #[test]
    fn lists_metrics_in_insertion_order() {
        let store = Store::open_in_memory().unwrap();
        let first = store.insert_metric(&sample_metric(CalcType::Sum)).unwrap();
        let second = store.insert_metric(&sample_metric(CalcType::Avg)).unwrap();

        let metrics = store.list_metrics().unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].id, first.id);
        assert_eq!(metrics[1].id, second.id);
        assert!(first.id < second.id);
    }

    #[test]
    fn update_rewrites_configuration() {
        let store = Store::open_in_memory().unwrap();
        let mut metric = store.insert_metric(&sample_metric(CalcType::Sum)).unwrap();

        metric.calc_type = CalcType::Avg;
        metric.default_value = 9.5;
        metric.places = 3;
        store.update_metric(&metric).unwrap();

        let found = store.get_metric(metric.id).unwrap().unwrap();
        assert_eq!(found, metric);

        metric.id += 100;
        assert!(store.update_metric(&metric).is_err());
    }

    #[test]
    fn sums_weighted_points_in_bucket() {
        let store = Store::open_in_memory().unwrap();
        let metric = store.insert_metric(&sample_metric(CalcType::Sum)).unwrap();
        let base = base_time();
        store
            .insert_points(&minute_burst(metric.id, base, &[(2.0, 1), (3.0, 1), (-1.0, 2)]))
            .unwrap();

        let got = store
            .bucket_aggregate(metric.id, Bucket::Minute, base, CalcType::Sum)
            .unwrap();
        assert_eq!(got, Some(3.0));
    }

    #[test]
    fn avg_weights_by_counter() {
        let store = Store::open_in_memory().unwrap();
        let metric = store.insert_metric(&sample_metric(CalcType::Avg)).unwrap();
        let base = base_time();
        store
            .insert_points(&minute_burst(metric.id, base, &[(4.0, 1), (6.0, 1)]))
            .unwrap();

        let got = store
            .bucket_aggregate(metric.id, Bucket::Minute, base, CalcType::Avg)
            .unwrap();
        assert_eq!(got, Some(5.0));
    }

    #[test]
    fn empty_bucket_yields_none() {
        let store = Store::open_in_memory().unwrap();
        let metric = store.insert_metric(&sample_metric(CalcType::Sum)).unwrap();

        let got = store
            .bucket_aggregate(metric.id, Bucket::Minute, base_time(), CalcType::Sum)
            .unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn minute_bucket_boundaries_are_exact() {
        let store = Store::open_in_memory().unwrap();
        let metric = store.insert_metric(&sample_metric(CalcType::Sum)).unwrap();
        let base = base_time();
        store
            .insert_points(&[
                point_at(metric.id, 100.0, 1, base - Duration::seconds(1)),
                point_at(metric.id, 1.0, 1, base),
                point_at(metric.id, 2.0, 1, base + Duration::seconds(59)),
                point_at(metric.id, 100.0, 1, base + Duration::seconds(60)),
            ])
            .unwrap();

        let got = store
            .bucket_aggregate(metric.id, Bucket::Minute, base, CalcType::Sum)
            .unwrap();
        assert_eq!(got, Some(3.0));
    }

    #[test]
    fn day_bucket_spans_whole_calendar_day() {
        let store = Store::open_in_memory().unwrap();
        let metric = store.insert_metric(&sample_metric(CalcType::Sum)).unwrap();
        let day = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        store
            .insert_points(&[
                point_at(metric.id, 100.0, 1, day - Duration::seconds(1)),
                point_at(metric.id, 1.0, 1, day),
                point_at(
                    metric.id,
                    2.0,
                    1,
                    day + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59),
                ),
                point_at(metric.id, 100.0, 1, day + Duration::days(1)),
            ])
            .unwrap();

        let got = store
            .bucket_aggregate(metric.id, Bucket::Day, day, CalcType::Sum)
            .unwrap();
        assert_eq!(got, Some(3.0));
    }

    #[test]
    fn points_of_other_metrics_are_ignored() {
        let store = Store::open_in_memory().unwrap();
        let first = store.insert_metric(&sample_metric(CalcType::Sum)).unwrap();
        let second = store.insert_metric(&sample_metric(CalcType::Sum)).unwrap();
        let base = base_time();
        store
            .insert_points(&[
                point_at(first.id, 1.0, 1, base),
                point_at(second.id, 50.0, 1, base),
            ])
            .unwrap();

        let got = store
            .bucket_aggregate(first.id, Bucket::Minute, base, CalcType::Sum)
            .unwrap();
        assert_eq!(got, Some(1.0));
    }

    #[test]
    fn rejects_points_for_unknown_metric() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.insert_points(&[point_at(999, 1.0, 1, base_time())]).is_err());
    }
}
