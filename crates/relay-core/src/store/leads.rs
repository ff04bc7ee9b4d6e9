use rusqlite::params;

use super::{BookingLead, LeadStatus, Store, parse_enum, parse_timestamp};
use crate::Result;

impl Store {
    /// Insert a lead unless the customer already has an open ("new") one.
    ///
    /// Returns `true` when the lead was created. The partial unique index on
    /// `(tenant_id, customer_phone) WHERE status = 'new'` makes this a single
    /// conditional write.
    pub fn create_lead_if_absent(&self, lead: &BookingLead) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO booking_leads (id, tenant_id, customer_phone, customer_name,
                message, status, source, provider, message_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                lead.id,
                lead.tenant_id,
                lead.customer_phone,
                lead.customer_name,
                lead.message,
                lead.status.as_str(),
                lead.source,
                lead.provider,
                lead.message_id,
                lead.created_at.to_rfc3339(),
                lead.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Leads for a tenant, newest first, optionally filtered by status
    pub fn list_leads(&self, tenant_id: &str, status: Option<LeadStatus>) -> Result<Vec<BookingLead>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, tenant_id, customer_phone, customer_name, message, status, source,
                provider, message_id, created_at, updated_at
             FROM booking_leads
             WHERE tenant_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![tenant_id, status.map(|s| s.as_str())], |row| {
            let status: String = row.get(5)?;
            let created_at: String = row.get(9)?;
            let updated_at: String = row.get(10)?;

            Ok(BookingLead {
                id: row.get(0)?,
                tenant_id: row.get(1)?,
                customer_phone: row.get(2)?,
                customer_name: row.get(3)?,
                message: row.get(4)?,
                status: parse_enum(&status)?,
                source: row.get(6)?,
                provider: row.get(7)?,
                message_id: row.get(8)?,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
            })
        })?;

        let mut result = Vec::new();
        for lead in rows {
            result.push(lead?);
        }
        Ok(result)
    }

    /// Move a lead to another status; returns `false` for an unknown id
    pub fn update_lead_status(&self, lead_id: &str, status: LeadStatus) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE booking_leads SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![lead_id, status.as_str(), chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(affected > 0)
    }
}
