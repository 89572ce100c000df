use duckdb::params;
use tally_core::error::{Result, TallyError};
use tally_core::model::metric::{Metric, NewMetric};
use tally_core::model::point::MetricPoint;

use crate::Store;

impl Store {
    pub fn insert_metric(&self, metric: &NewMetric) -> Result<Metric> {
        let conn = self.conn();
        let id = conn
            .query_row(
                "INSERT INTO metrics (id, name, suffix, description, calc_type, default_value, places)
                 VALUES (nextval('metrics_id_seq'), ?, ?, ?, ?, ?, ?)
                 RETURNING id",
                params![
                    metric.name,
                    metric.suffix,
                    metric.description,
                    metric.calc_type.as_stored(),
                    metric.default_value,
                    i64::from(metric.places),
                ],
                |row| row.get::<_, i64>(0),
            )
            .map_err(|e| TallyError::Store(format!("insert metric failed: {e}")))?;

        Ok(metric.clone().with_id(id))
    }

    pub fn update_metric(&self, metric: &Metric) -> Result<()> {
        let conn = self.conn();
        let updated = conn
            .execute(
                "UPDATE metrics
                 SET name = ?, suffix = ?, description = ?, calc_type = ?, default_value = ?, places = ?
                 WHERE id = ?",
                params![
                    metric.name,
                    metric.suffix,
                    metric.description,
                    metric.calc_type.as_stored(),
                    metric.default_value,
                    i64::from(metric.places),
                    metric.id,
                ],
            )
            .map_err(|e| TallyError::Store(format!("update metric failed: {e}")))?;

        if updated == 0 {
            return Err(TallyError::Store(format!("metric not found: {}", metric.id)));
        }
        Ok(())
    }

    pub fn insert_points(&self, points: &[MetricPoint]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| TallyError::Store(format!("begin tx failed: {e}")))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO metric_points (id, metric_id, value, counter, created_at)
                     VALUES (nextval('metric_points_id_seq'), ?, ?, ?, ?)",
                )
                .map_err(|e| TallyError::Store(format!("prepare insert points failed: {e}")))?;

            for point in points {
                stmt.execute(params![
                    point.metric_id,
                    point.value,
                    point.counter,
                    point.created_at.to_rfc3339(),
                ])
                .map_err(|e| TallyError::Store(format!("insert point failed: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| TallyError::Store(format!("commit points failed: {e}")))
    }
}
