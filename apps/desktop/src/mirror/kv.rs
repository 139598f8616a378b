//! SQLite-backed key-value preferences holding the calendar collection.

use super::{CalendarMirror, MirrorError, MirrorSnapshot};
use crate::db::schema::PREFERENCES_SCHEMA;
use alarm_core::error::ReminderError;
use alarm_core::mirror::MirrorEntry;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Preference key the calendar view reads.
pub const CALENDAR_KEY: &str = "calendar_reminders";

/// Calendar mirror stored as one JSON value in a preferences table.
pub struct SqliteKvMirror {
    conn: Mutex<Connection>,
    key: String,
}

impl SqliteKvMirror {
    /// Open preferences at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MirrorError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open in-memory preferences (for testing).
    pub fn open_in_memory() -> Result<Self, MirrorError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, MirrorError> {
        conn.execute_batch(PREFERENCES_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: CALENDAR_KEY.to_string(),
        })
    }

    /// Overwrite the raw stored value, bypassing revision checks.
    ///
    /// Used to import data written by older versions of the app.
    pub fn write_raw(&self, raw: &str) -> Result<u64, MirrorError> {
        let conn = self.conn.lock().map_err(|_| MirrorError::Poisoned)?;
        conn.execute(
            "INSERT INTO preferences (key, value, revision) VALUES (?1, ?2, 1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, revision = revision + 1",
            params![self.key, raw],
        )?;
        let revision: i64 = conn.query_row(
            "SELECT revision FROM preferences WHERE key = ?1",
            params![self.key],
            |row| row.get(0),
        )?;
        Ok(revision as u64)
    }
}

#[async_trait]
impl CalendarMirror for SqliteKvMirror {
    async fn load_all(&self) -> Result<MirrorSnapshot, MirrorError> {
        let conn = self.conn.lock().map_err(|_| MirrorError::Poisoned)?;
        let stored: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, revision FROM preferences WHERE key = ?1",
                params![self.key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((raw, revision)) = stored else {
            return Ok(MirrorSnapshot::default());
        };

        let entries = match MirrorEntry::parse_collection(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                let error = ReminderError::Parse(e.to_string());
                tracing::warn!(%error, revision, "treating calendar mirror as empty");
                Vec::new()
            }
        };

        Ok(MirrorSnapshot {
            entries,
            revision: revision as u64,
        })
    }

    async fn replace_all(
        &self,
        entries: Vec<MirrorEntry>,
        expected_revision: u64,
    ) -> Result<u64, MirrorError> {
        let raw = MirrorEntry::to_collection(&entries)?;
        let mut conn = self.conn.lock().map_err(|_| MirrorError::Poisoned)?;
        let tx = conn.transaction()?;

        let actual = tx
            .query_row(
                "SELECT revision FROM preferences WHERE key = ?1",
                params![self.key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .unwrap_or(0) as u64;

        if actual != expected_revision {
            return Err(MirrorError::RevisionConflict {
                expected: expected_revision,
                actual,
            });
        }

        let next = expected_revision + 1;
        tx.execute(
            "INSERT OR REPLACE INTO preferences (key, value, revision) VALUES (?1, ?2, ?3)",
            params![self.key, raw, next as i64],
        )?;
        tx.commit()?;

        Ok(next)
    }
}
