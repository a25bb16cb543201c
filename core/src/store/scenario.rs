//! Store methods for saved scenarios and the per-workspace active id.

use crate::{
    error::PersistenceError,
    scenario::{Scenario, ScenarioData, DEFAULT_SCENARIO_ID},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{PlanStore, StoreResult};

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

impl PlanStore {
    /// All saved scenarios of a workspace, in insertion order.
    pub fn scenarios(&self, workspace: &str) -> StoreResult<Vec<Scenario>> {
        let mut stmt = self.conn.prepare(
            "SELECT scenario_id, name, created_at, updated_at, data_json
             FROM scenario WHERE workspace = ?1
             ORDER BY position ASC",
        )?;
        let rows = stmt
            .query_map(params![workspace], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    parse_timestamp(2, row.get(2)?)?,
                    parse_timestamp(3, row.get(3)?)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, created_at, updated_at, data_json)| -> StoreResult<Scenario> {
                let data: ScenarioData = serde_json::from_str(&data_json)?;
                Ok(Scenario { id, name, created_at, updated_at, data })
            })
            .collect()
    }

    /// Append one scenario after the existing ones.
    pub fn insert_scenario(&self, workspace: &str, scenario: &Scenario) -> StoreResult<()> {
        reject_default(&scenario.id)?;
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM scenario WHERE workspace = ?1",
            params![workspace],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO scenario (workspace, scenario_id, name, position, created_at, updated_at, data_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                workspace,
                &scenario.id,
                &scenario.name,
                position,
                scenario.created_at.to_rfc3339(),
                scenario.updated_at.to_rfc3339(),
                serde_json::to_string(&scenario.data)?,
            ],
        )?;
        Ok(())
    }

    /// Replace the whole scenario list and the active id in one transaction.
    /// A "default" row in the input is skipped.
    pub fn replace_scenarios(
        &self,
        workspace: &str,
        scenarios: &[Scenario],
        active_id: &str,
    ) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM scenario WHERE workspace = ?1", params![workspace])?;
        for (position, scenario) in scenarios.iter().filter(|s| !s.is_default()).enumerate() {
            tx.execute(
                "INSERT INTO scenario (workspace, scenario_id, name, position, created_at, updated_at, data_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    workspace,
                    &scenario.id,
                    &scenario.name,
                    position as i64,
                    scenario.created_at.to_rfc3339(),
                    scenario.updated_at.to_rfc3339(),
                    serde_json::to_string(&scenario.data)?,
                ],
            )?;
        }
        tx.execute(
            "INSERT INTO workspace_state (workspace, active_scenario_id, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(workspace) DO UPDATE SET
                active_scenario_id = excluded.active_scenario_id,
                updated_at = excluded.updated_at",
            params![workspace, active_id, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Remove one scenario. Returns false when no such row existed.
    pub fn delete_scenario(&self, workspace: &str, scenario_id: &str) -> StoreResult<bool> {
        reject_default(scenario_id)?;
        let removed = self.conn.execute(
            "DELETE FROM scenario WHERE workspace = ?1 AND scenario_id = ?2",
            params![workspace, scenario_id],
        )?;
        Ok(removed > 0)
    }

    pub fn active_scenario_id(&self, workspace: &str) -> StoreResult<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT active_scenario_id FROM workspace_state WHERE workspace = ?1",
                params![workspace],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    pub fn set_active_scenario_id(&self, workspace: &str, scenario_id: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO workspace_state (workspace, active_scenario_id, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(workspace) DO UPDATE SET
                active_scenario_id = excluded.active_scenario_id,
                updated_at = excluded.updated_at",
            params![workspace, scenario_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Number of saved rows for a workspace (for tests).
    pub fn scenario_count(&self, workspace: &str) -> StoreResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM scenario WHERE workspace = ?1",
            params![workspace],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn reject_default(scenario_id: &str) -> StoreResult<()> {
    if scenario_id == DEFAULT_SCENARIO_ID {
        return Err(PersistenceError::Rejected {
            reason: "the default scenario is derived and cannot be stored or deleted".into(),
        });
    }
    Ok(())
}
