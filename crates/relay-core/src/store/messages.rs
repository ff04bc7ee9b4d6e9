use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use super::{
    ContentType, Direction, InboundMessage, OutboundMessage, Store, StatusUpdate, parse_enum,
    parse_json, parse_timestamp,
};
use crate::Result;

impl Store {
    /// Insert or refresh an inbound message keyed by (tenant, message id)
    ///
    /// A redelivered webhook overwrites the content fields but keeps the
    /// original `created_at` and any read flag already set.
    pub fn upsert_inbound(&self, message: &InboundMessage) -> Result<()> {
        let raw = serde_json::to_string(&message.raw)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO messages (tenant_id, message_id, direction, phone, name, body,
                content_type, media, provider, raw, read, status, error_code, error_message,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(tenant_id, message_id) DO UPDATE SET
                phone = excluded.phone,
                name = excluded.name,
                body = excluded.body,
                content_type = excluded.content_type,
                media = excluded.media,
                raw = excluded.raw,
                read = MAX(messages.read, excluded.read),
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![
                message.tenant_id,
                message.message_id,
                Direction::Incoming.as_str(),
                message.sender_phone,
                message.sender_name,
                message.body,
                message.content_type.as_str(),
                message.media,
                message.provider,
                raw,
                message.read,
                message.status,
                message.error_code,
                message.error_message,
                message.created_at.to_rfc3339(),
                message.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Persist the record of a successful send
    pub fn record_outbound(&self, message: &OutboundMessage) -> Result<()> {
        let raw = serde_json::to_string(&message.raw)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO messages (tenant_id, message_id, direction, phone,
                template_name, provider, raw, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                message.tenant_id,
                message.message_id,
                Direction::Outgoing.as_str(),
                message.recipient,
                message.template_name,
                message.provider,
                raw,
                message.status,
                message.created_at.to_rfc3339(),
                message.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Apply a delivery status; returns `false` when the message is unknown
    pub fn apply_status(&self, tenant_id: &str, update: &StatusUpdate) -> Result<bool> {
        let updated_at = update.timestamp.unwrap_or_else(Utc::now).to_rfc3339();
        let conn = self.conn()?;
        let affected = conn.execute(
            "UPDATE messages SET
                status = ?3,
                read = CASE WHEN ?4 THEN 1 ELSE read END,
                error_code = COALESCE(?5, error_code),
                error_message = COALESCE(?6, error_message),
                updated_at = ?7
             WHERE tenant_id = ?1 AND message_id = ?2",
            params![
                tenant_id,
                update.message_id,
                update.status,
                update.is_read(),
                update.error_code,
                update.error_message,
                updated_at,
            ],
        )?;
        Ok(affected > 0)
    }

    /// Tenant owning a message id, used to route status webhooks
    pub fn find_message_tenant(&self, message_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let tenant = conn
            .query_row(
                "SELECT tenant_id FROM messages WHERE message_id = ?1 LIMIT 1",
                params![message_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(tenant)
    }

    pub fn get_inbound(&self, tenant_id: &str, message_id: &str) -> Result<Option<InboundMessage>> {
        let conn = self.conn()?;
        let message = conn
            .query_row(
                "SELECT message_id, tenant_id, phone, name, body, content_type, media, provider,
                    raw, read, status, error_code, error_message, created_at, updated_at
                 FROM messages
                 WHERE tenant_id = ?1 AND message_id = ?2 AND direction = 'incoming'",
                params![tenant_id, message_id],
                |row| {
                    let content_type: String = row.get(5)?;
                    let raw: String = row.get(8)?;
                    let created_at: String = row.get(13)?;
                    let updated_at: String = row.get(14)?;

                    Ok(InboundMessage {
                        message_id: row.get(0)?,
                        tenant_id: row.get(1)?,
                        sender_phone: row.get(2)?,
                        sender_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                        body: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                        content_type: parse_enum::<ContentType>(&content_type)?,
                        media: row.get(6)?,
                        provider: row.get(7)?,
                        raw: parse_json(&raw)?,
                        read: row.get(9)?,
                        status: row.get(10)?,
                        error_code: row.get(11)?,
                        error_message: row.get(12)?,
                        created_at: parse_timestamp(&created_at)?,
                        updated_at: parse_timestamp(&updated_at)?,
                    })
                },
            )
            .optional()?;
        Ok(message)
    }

    /// Outbound records for a tenant, newest first
    pub fn list_outbound(&self, tenant_id: &str) -> Result<Vec<OutboundMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT message_id, tenant_id, phone, template_name, provider, status, raw,
                created_at, updated_at
             FROM messages
             WHERE tenant_id = ?1 AND direction = 'outgoing'
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![tenant_id], |row| {
            let raw: String = row.get(6)?;
            let created_at: String = row.get(7)?;
            let updated_at: String = row.get(8)?;

            Ok(OutboundMessage {
                message_id: row.get(0)?,
                tenant_id: row.get(1)?,
                recipient: row.get(2)?,
                template_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                provider: row.get(4)?,
                status: row.get(5)?,
                raw: parse_json(&raw)?,
                created_at: parse_timestamp(&created_at)?,
                updated_at: parse_timestamp(&updated_at)?,
            })
        })?;

        let mut result = Vec::new();
        for message in rows {
            result.push(message?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inbound(id: &str, body: &str) -> InboundMessage {
        let now = Utc::now();
        InboundMessage {
            message_id: id.into(),
            tenant_id: "t1".into(),
            sender_phone: "+919876543210".into(),
            sender_name: "Asha".into(),
            body: body.into(),
            content_type: ContentType::Text,
            media: None,
            provider: "myoperator".into(),
            raw: json!({"id": id}),
            read: false,
            status: "received".into(),
            error_code: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_upsert_inbound_is_idempotent() {
        let store = Store::in_memory().unwrap();
        store.upsert_inbound(&inbound("wamid.1", "hello")).unwrap();
        store.upsert_inbound(&inbound("wamid.1", "hello again")).unwrap();

        let stored = store.get_inbound("t1", "wamid.1").unwrap().unwrap();
        assert_eq!(stored.body, "hello again");
        assert_eq!(stored.content_type, ContentType::Text);
        assert_eq!(stored.raw, json!({"id": "wamid.1"}));
    }

    #[test]
    fn test_apply_status_sets_read_and_errors() {
        let store = Store::in_memory().unwrap();
        store.upsert_inbound(&inbound("wamid.2", "hi")).unwrap();

        let applied = store
            .apply_status(
                "t1",
                &StatusUpdate {
                    message_id: "wamid.2".into(),
                    status: "read".into(),
                    timestamp: None,
                    error_code: None,
                    error_message: None,
                },
            )
            .unwrap();
        assert!(applied);

        let stored = store.get_inbound("t1", "wamid.2").unwrap().unwrap();
        assert!(stored.read);
        assert_eq!(stored.status, "read");

        store
            .apply_status(
                "t1",
                &StatusUpdate {
                    message_id: "wamid.2".into(),
                    status: "failed".into(),
                    timestamp: None,
                    error_code: Some("63016".into()),
                    error_message: Some("Outside session window".into()),
                },
            )
            .unwrap();
        let stored = store.get_inbound("t1", "wamid.2").unwrap().unwrap();
        assert!(stored.read);
        assert_eq!(stored.error_code.as_deref(), Some("63016"));
    }

    #[test]
    fn test_apply_status_unknown_message() {
        let store = Store::in_memory().unwrap();
        let update = StatusUpdate {
            message_id: "missing".into(),
            status: "delivered".into(),
            timestamp: None,
            error_code: None,
            error_message: None,
        };
        assert!(!store.apply_status("t1", &update).unwrap());
    }

    #[test]
    fn test_outbound_record_and_tenant_lookup() {
        let store = Store::in_memory().unwrap();
        let now = Utc::now();
        store
            .record_outbound(&OutboundMessage {
                message_id: "SM123".into(),
                tenant_id: "t9".into(),
                recipient: "+15550001111".into(),
                template_name: "order_confirmation".into(),
                provider: "twilio".into(),
                status: "sent".into(),
                raw: json!({"sid": "SM123"}),
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        assert_eq!(store.find_message_tenant("SM123").unwrap().as_deref(), Some("t9"));
        assert!(store.find_message_tenant("SM999").unwrap().is_none());

        let outbound = store.list_outbound("t9").unwrap();
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].template_name, "order_confirmation");
        assert!(store.get_inbound("t9", "SM123").unwrap().is_none());
    }
}
