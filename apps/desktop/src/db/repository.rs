//! Repository pattern for reminder storage.

use crate::db::error::DbError;
use alarm_core::types::{Reminder, ReminderId, ReminderState};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

type Result<T> = std::result::Result<T, DbError>;

/// Repository for reminder records.
pub trait ReminderRepository {
    fn insert(&self, reminder: &Reminder) -> Result<()>;
    fn get(&self, id: ReminderId) -> Result<Option<Reminder>>;
    /// Move a reminder to a new time, marking it snoozed. Returns false if absent.
    fn update_time(&self, id: ReminderId, new_time: DateTime<Utc>) -> Result<bool>;
    /// Returns false if absent.
    fn delete(&self, id: ReminderId) -> Result<bool>;
    /// Reminders that should have a live OS alarm.
    fn list_active(&self) -> Result<Vec<Reminder>>;
    /// Active reminders whose time is at or before `now`.
    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>>;
    fn count_past(&self, cutoff: DateTime<Utc>) -> Result<usize>;
    fn delete_past(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Reminder repository shared between the coordinator and the sweeper.
pub type SharedRepository = Arc<Mutex<dyn ReminderRepository + Send>>;

/// SQLite implementation of the reminder repository.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Wrap into the shared handle used by the coordinator.
    pub fn into_shared(self) -> SharedRepository {
        Arc::new(Mutex::new(self))
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(super::schema::SCHEMA)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![super::schema::SCHEMA_VERSION],
        )?;
        Ok(())
    }

    fn row_to_reminder(row: &rusqlite::Row) -> rusqlite::Result<(Reminder, String)> {
        let scheduled_ms: i64 = row.get(3)?;
        let state_str: String = row.get(4)?;
        let reminder = Reminder {
            id: ReminderId::new(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            scheduled_at: Utc
                .timestamp_millis_opt(scheduled_ms)
                .single()
                .unwrap_or_default(),
            state: ReminderState::from_str(&state_str).unwrap_or_default(),
            snooze_generation: row.get(5)?,
        };
        Ok((reminder, state_str))
    }

    fn query_reminders(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Reminder>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::row_to_reminder)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (reminder, state_str) in &rows {
            if ReminderState::from_str(state_str).is_none() {
                tracing::warn!(
                    reminder_id = %reminder.id,
                    state = %state_str,
                    "unknown reminder state, treating as scheduled"
                );
            }
        }

        Ok(rows.into_iter().map(|(reminder, _)| reminder).collect())
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, title, description, scheduled_at, state, snooze_generation FROM reminders";

impl ReminderRepository for SqliteRepository {
    fn insert(&self, reminder: &Reminder) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO reminders (id, title, description, scheduled_at, state, snooze_generation, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                reminder.id.get(),
                reminder.title,
                reminder.description,
                reminder.scheduled_at.timestamp_millis(),
                reminder.state.as_str(),
                reminder.snooze_generation,
                now,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: ReminderId) -> Result<Option<Reminder>> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        self.conn
            .query_row(&sql, params![id.get()], Self::row_to_reminder)
            .optional()
            .map(|row| row.map(|(reminder, _)| reminder))
            .map_err(Into::into)
    }

    fn update_time(&self, id: ReminderId, new_time: DateTime<Utc>) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let count = self.conn.execute(
            "UPDATE reminders
             SET scheduled_at = ?1, state = 'snoozed', snooze_generation = snooze_generation + 1, updated_at = ?2
             WHERE id = ?3",
            params![new_time.timestamp_millis(), now, id.get()],
        )?;
        Ok(count > 0)
    }

    fn delete(&self, id: ReminderId) -> Result<bool> {
        let count = self
            .conn
            .execute("DELETE FROM reminders WHERE id = ?1", params![id.get()])?;
        Ok(count > 0)
    }

    fn list_active(&self) -> Result<Vec<Reminder>> {
        let sql = format!(
            "{} WHERE state IN ('scheduled', 'snoozed') ORDER BY scheduled_at",
            SELECT_COLUMNS
        );
        self.query_reminders(&sql, &[])
    }

    fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        let sql = format!(
            "{} WHERE state IN ('scheduled', 'snoozed') AND scheduled_at <= ?1 ORDER BY scheduled_at",
            SELECT_COLUMNS
        );
        self.query_reminders(&sql, &[&now.timestamp_millis()])
    }

    fn count_past(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM reminders WHERE scheduled_at < ?1",
            params![cutoff.timestamp_millis()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_past(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let count = self.conn.execute(
            "DELETE FROM reminders WHERE scheduled_at < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(count)
    }
}
