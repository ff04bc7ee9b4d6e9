//! SQLite persistence for messages, booking leads and scheduled actions

mod actions;
mod leads;
mod messages;
mod types;

pub use types::{
    ActionKind, ActionPayload, BookingLead, ContentType, Direction, InboundMessage, LeadStatus,
    OutboundMessage, ScheduledAction, StatusUpdate,
};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::{Error, Result};

/// SQLite-backed store shared by the dispatcher, classifier and scheduler
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `db_path`
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    fn init_tables(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                tenant_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                direction TEXT NOT NULL,
                phone TEXT NOT NULL,
                name TEXT,
                body TEXT,
                content_type TEXT,
                media TEXT,
                template_name TEXT,
                provider TEXT NOT NULL,
                raw TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                error_code TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (tenant_id, message_id)
            );
            CREATE INDEX IF NOT EXISTS idx_messages_message_id ON messages(message_id);

            CREATE TABLE IF NOT EXISTS booking_leads (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                customer_phone TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                message TEXT NOT NULL,
                status TEXT NOT NULL,
                source TEXT NOT NULL,
                provider TEXT NOT NULL,
                message_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_booking_leads_open
                ON booking_leads(tenant_id, customer_phone) WHERE status = 'new';

            CREATE TABLE IF NOT EXISTS scheduled_actions (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                customer_phone TEXT NOT NULL,
                kind TEXT NOT NULL,
                due_at TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (tenant_id, customer_phone, kind)
            );",
        )?;
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_json<T: serde::de::DeserializeOwned>(value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_enum<T: std::str::FromStr<Err = String>>(value: &str) -> rusqlite::Result<T> {
    value.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
    })
}
