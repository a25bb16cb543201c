//! Store methods for the baseline recommendation history.

use crate::scenario::Baseline;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{PlanStore, StoreResult};

impl PlanStore {
    /// Record a baseline that changed the default scenario.
    pub fn insert_baseline(&self, workspace: &str, baseline: &Baseline) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO baseline_history (workspace, base_up, merit, applied_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                workspace,
                baseline.base_up_percentage,
                baseline.merit_increase_percentage,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The most recently applied baseline, if any.
    pub fn latest_baseline(&self, workspace: &str) -> StoreResult<Option<Baseline>> {
        let baseline = self
            .conn
            .query_row(
                "SELECT base_up, merit FROM baseline_history
                 WHERE workspace = ?1
                 ORDER BY id DESC LIMIT 1",
                params![workspace],
                |row| Ok(Baseline::new(row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(baseline)
    }
}
