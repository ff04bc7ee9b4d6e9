use rusqlite::{OptionalExtension, Row, params};

use super::{ScheduledAction, Store, parse_enum, parse_json, parse_timestamp};
use crate::Result;

const ACTION_COLUMNS: &str = "id, tenant_id, customer_phone, kind, due_at, payload, created_at";

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<ScheduledAction> {
    let kind: String = row.get(3)?;
    let due_at: String = row.get(4)?;
    let payload: String = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(ScheduledAction {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        customer_phone: row.get(2)?,
        kind: parse_enum(&kind)?,
        due_at: parse_timestamp(&due_at)?,
        payload: parse_json(&payload)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl Store {
    /// Arm an action, superseding any pending one with the same
    /// (tenant, customer, kind) key.
    pub fn upsert_action(&self, action: &ScheduledAction) -> Result<()> {
        let payload = serde_json::to_string(&action.payload)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO scheduled_actions
                (id, tenant_id, customer_phone, kind, due_at, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                action.id,
                action.tenant_id,
                action.customer_phone,
                action.kind.as_str(),
                action.due_at.to_rfc3339(),
                payload,
                action.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Claim an action for firing.
    ///
    /// Returns `false` when the row is gone, i.e. it was superseded or
    /// already fired.
    pub fn claim_action(&self, action_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM scheduled_actions WHERE id = ?1",
            params![action_id],
        )?;
        Ok(deleted == 1)
    }

    pub fn get_action(&self, action_id: &str) -> Result<Option<ScheduledAction>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM scheduled_actions WHERE id = ?1", ACTION_COLUMNS);
        let action = conn
            .query_row(&sql, params![action_id], action_from_row)
            .optional()?;
        Ok(action)
    }

    /// All armed actions, earliest due first
    pub fn pending_actions(&self) -> Result<Vec<ScheduledAction>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM scheduled_actions ORDER BY due_at ASC",
            ACTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], action_from_row)?;

        let mut result = Vec::new();
        for action in rows {
            result.push(action?);
        }
        Ok(result)
    }
}
