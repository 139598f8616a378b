//! Removal of past-dated reminders from the store and the calendar mirror.

use alarm_core::clock::Clock;
use alarm_core::error::{ReminderError, StoreKind};
use alarm_core::mirror::MirrorEntry;
use std::sync::Arc;

use crate::db::date_utils::{local_today, start_of_local_day};
use crate::db::{DbError, SharedRepository};
use crate::mirror::{mutate_mirror, CalendarMirror};
use crate::sync::DEFAULT_MIRROR_ATTEMPTS;

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub reminders_removed: usize,
    pub mirror_removed: usize,
    /// Stores that could not be swept this time; the next sweep retries.
    pub failures: Vec<ReminderError>,
}

impl SweepReport {
    pub fn total_removed(&self) -> usize {
        self.reminders_removed + self.mirror_removed
    }
}

pub struct CleanupSweeper {
    repository: SharedRepository,
    mirror: Arc<dyn CalendarMirror>,
    clock: Arc<dyn Clock>,
    mirror_attempts: usize,
}

impl CleanupSweeper {
    pub fn new(
        repository: SharedRepository,
        mirror: Arc<dyn CalendarMirror>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            mirror,
            clock,
            mirror_attempts: DEFAULT_MIRROR_ATTEMPTS,
        }
    }

    pub fn with_mirror_attempts(mut self, attempts: usize) -> Self {
        self.mirror_attempts = attempts;
        self
    }

    /// Delete everything dated before the start of the current local day.
    ///
    /// Today's entries stay even when their time has already passed. The two
    /// stores are swept independently.
    pub async fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let cutoff = start_of_local_day(now);
        let today = local_today(now);
        let mut report = SweepReport::default();

        match self.with_repository(|repo| repo.delete_past(cutoff)) {
            Ok(removed) => report.reminders_removed = removed,
            Err(e) => {
                tracing::warn!(store = %StoreKind::Reminders, error = %e, "sweep failed");
                report
                    .failures
                    .push(ReminderError::store_write(StoreKind::Reminders, e.to_string()));
            }
        }

        let mut mirror_removed = 0;
        let result = mutate_mirror(self.mirror.as_ref(), self.mirror_attempts, |entries| {
            let before = entries.len();
            entries.retain(|entry| match entry.local_date() {
                Some(date) => date >= today,
                None => {
                    tracing::warn!(entry_id = %entry.id, date = %entry.date, "keeping mirror entry with unreadable date");
                    true
                }
            });
            mirror_removed = before - entries.len();
            mirror_removed > 0
        })
        .await;

        match result {
            Ok(_) => report.mirror_removed = mirror_removed,
            Err(e) => {
                tracing::warn!(store = %StoreKind::CalendarMirror, error = %e, "sweep failed");
                report
                    .failures
                    .push(ReminderError::store_write(StoreKind::CalendarMirror, e.to_string()));
            }
        }

        if report.total_removed() > 0 {
            tracing::info!(
                reminders = report.reminders_removed,
                mirror = report.mirror_removed,
                "swept past reminders"
            );
        }
        report
    }

    /// Reminders a sweep would remove right now.
    pub fn pending(&self) -> Result<usize, ReminderError> {
        let cutoff = start_of_local_day(self.clock.now());
        self.with_repository(|repo| repo.count_past(cutoff))
            .map_err(|e| ReminderError::store_write(StoreKind::Reminders, e.to_string()))
    }

    /// Calendar view load: sweep, then return the mirror in date order.
    pub async fn load_calendar(&self) -> Result<Vec<MirrorEntry>, ReminderError> {
        self.sweep().await;
        let snapshot = self
            .mirror
            .load_all()
            .await
            .map_err(|e| ReminderError::store_write(StoreKind::CalendarMirror, e.to_string()))?;

        let mut entries = snapshot.entries;
        entries.sort_by(|a, b| {
            a.local_date()
                .cmp(&b.local_date())
                .then(a.time_hour.cmp(&b.time_hour))
                .then(a.time_minute.cmp(&b.time_minute))
        });
        Ok(entries)
    }

    fn with_repository<T>(
        &self,
        f: impl FnOnce(&(dyn crate::db::ReminderRepository + Send)) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let repo = self.repository.lock().map_err(|_| DbError::Poisoned)?;
        f(&*repo)
    }
}
