//! Database error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("reminder not found: {0}")]
    ReminderNotFound(i64),

    #[error("repository lock poisoned")]
    Poisoned,
}
