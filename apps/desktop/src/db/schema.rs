//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Schema for the reminder store.
pub const SCHEMA: &str = r#"
-- Reminder records (source of truth for time and state)
CREATE TABLE IF NOT EXISTS reminders (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    scheduled_at INTEGER NOT NULL,
    state TEXT NOT NULL DEFAULT 'scheduled',
    snooze_generation INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_reminders_scheduled_at ON reminders(scheduled_at);
CREATE INDEX IF NOT EXISTS idx_reminders_state ON reminders(state);
"#;

/// Schema for the key-value preferences store backing the calendar mirror.
pub const PREFERENCES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS preferences (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    revision INTEGER NOT NULL DEFAULT 0
);
"#;
