//! Calendar mirror: a versioned key-value copy of reminders for the calendar view.
//!
//! Several surfaces read and write the mirror without a shared in-memory
//! model. Every writer reloads the whole collection, mutates it and writes the
//! whole collection back, and the write only lands if the stored revision is
//! still the one that was read. [`mutate_mirror`] runs that cycle and retries
//! on conflict, giving last-writer-wins at collection granularity.

mod kv;

pub use kv::SqliteKvMirror;

use alarm_core::mirror::MirrorEntry;
use async_trait::async_trait;
use thiserror::Error;

/// Mirror errors.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("revision conflict: expected {expected}, found {actual}")]
    RevisionConflict { expected: u64, actual: u64 },

    #[error("mirror unavailable: {0}")]
    Unavailable(String),

    #[error("mirror lock poisoned")]
    Poisoned,
}

/// The whole collection as read, with the revision it was read at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorSnapshot {
    pub entries: Vec<MirrorEntry>,
    pub revision: u64,
}

/// Key-value store holding the calendar's reminder collection.
#[async_trait]
pub trait CalendarMirror: Send + Sync {
    /// Read the collection from persistent storage.
    ///
    /// Corrupt data loads as an empty collection at the stored revision.
    async fn load_all(&self) -> Result<MirrorSnapshot, MirrorError>;

    /// Replace the whole collection if the stored revision equals
    /// `expected_revision`. Returns the new revision.
    async fn replace_all(
        &self,
        entries: Vec<MirrorEntry>,
        expected_revision: u64,
    ) -> Result<u64, MirrorError>;
}

/// Outcome of a [`mutate_mirror`] cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorMutation {
    /// The mutation changed nothing, so nothing was written.
    Unchanged,
    /// The collection was written at this revision.
    Written { revision: u64 },
}

/// Reload, mutate the whole collection, and write it back.
///
/// `mutate` returns whether it changed anything. It may run more than once
/// when a concurrent writer bumps the revision in between.
pub async fn mutate_mirror<F>(
    mirror: &dyn CalendarMirror,
    attempts: usize,
    mut mutate: F,
) -> Result<MirrorMutation, MirrorError>
where
    F: FnMut(&mut Vec<MirrorEntry>) -> bool + Send,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let MirrorSnapshot {
            mut entries,
            revision,
        } = mirror.load_all().await?;

        if !mutate(&mut entries) {
            return Ok(MirrorMutation::Unchanged);
        }

        match mirror.replace_all(entries, revision).await {
            Ok(revision) => return Ok(MirrorMutation::Written { revision }),
            Err(MirrorError::RevisionConflict { expected, actual }) if attempt < attempts => {
                tracing::debug!(expected, actual, attempt, "calendar mirror changed underneath, reloading");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
