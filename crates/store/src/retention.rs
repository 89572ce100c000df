use std::time::Duration;

use chrono::Utc;
use duckdb::params;
use tally_core::error::{Result, TallyError};

use crate::Store;

impl Store {
    pub fn prune_points(&self, older_than: Duration) -> Result<usize> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| TallyError::Internal(format!("ttl conversion failed: {e}")))?;

        let conn = self.conn();
        let deleted = conn
            .execute(
                "DELETE FROM metric_points WHERE created_at < ?",
                params![cutoff.to_rfc3339()],
            )
            .map_err(|e| TallyError::Store(format!("prune points failed: {e}")))?;

        tracing::debug!(deleted, "pruned aged metric points");
        Ok(deleted)
    }
}
