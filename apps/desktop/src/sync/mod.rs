//! Coordinates reminder writes across the reminder store, the calendar mirror
//! and the OS scheduler.
//!
//! The three stores share no transaction. Each write is attempted on its own;
//! a failure is logged and recorded in the returned [`SyncReport`] but never
//! blocks the sibling writes. Anything left inconsistent is repaired by
//! [`SyncCoordinator::reconcile`] on the next full reload.

mod outcome;

pub use outcome::{OperationOutcome, ReconcileReport, SyncReport};

use alarm_core::clock::Clock;
use alarm_core::error::{ReminderError, StoreKind};
use alarm_core::mirror::MirrorEntry;
use alarm_core::identity::LegacyId;
use alarm_core::types::{AlarmPayload, Reminder, ReminderId, ReminderState};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::{DbError, ReminderRepository, SharedRepository};
use crate::mirror::{mutate_mirror, CalendarMirror, MirrorError, MirrorMutation};
use crate::presentation::{AlertSound, SilentAlertSound};
use crate::scheduler::{NotificationScheduler, PermissionStatus};

/// Default number of reload-mutate-replace attempts against the mirror.
pub const DEFAULT_MIRROR_ATTEMPTS: usize = 3;

/// Fallback title when neither store knows the reminder.
const UNTITLED: &str = "Reminder";

/// Inner state shared across clones.
struct SyncCoordinatorInner {
    repository: SharedRepository,
    mirror: Arc<dyn CalendarMirror>,
    scheduler: Arc<dyn NotificationScheduler>,
    sound: Arc<dyn AlertSound>,
    clock: Arc<dyn Clock>,
    mirror_attempts: usize,
}

/// Orchestrates create, snooze and dismiss across the three stores.
///
/// Clone-able: all state lives behind an `Arc`, so every UI surface can hold
/// its own handle.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<SyncCoordinatorInner>,
}

impl SyncCoordinator {
    /// Create a coordinator over the given collaborators.
    pub fn new(
        repository: SharedRepository,
        mirror: Arc<dyn CalendarMirror>,
        scheduler: Arc<dyn NotificationScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_options(
            repository,
            mirror,
            scheduler,
            clock,
            Arc::new(SilentAlertSound),
            DEFAULT_MIRROR_ATTEMPTS,
        )
    }

    pub fn with_options(
        repository: SharedRepository,
        mirror: Arc<dyn CalendarMirror>,
        scheduler: Arc<dyn NotificationScheduler>,
        clock: Arc<dyn Clock>,
        sound: Arc<dyn AlertSound>,
        mirror_attempts: usize,
    ) -> Self {
        Self {
            inner: Arc::new(SyncCoordinatorInner {
                repository,
                mirror,
                scheduler,
                sound,
                clock,
                mirror_attempts,
            }),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Create a reminder in all three stores and register its alarm.
    ///
    /// Permission is checked before any store is touched, so a denial leaves
    /// no orphan records behind.
    pub async fn create(&self, reminder: Reminder) -> Result<SyncReport, ReminderError> {
        let now = self.now();
        if reminder.scheduled_at <= now {
            return Err(ReminderError::PastSchedule {
                scheduled_at: reminder.scheduled_at,
            });
        }

        if self.inner.scheduler.request_permission().await != PermissionStatus::Granted {
            tracing::warn!(reminder_id = %reminder.id, "notification permission denied, reminder not created");
            return Err(ReminderError::PermissionDenied);
        }

        let id = reminder.id;
        let mut report = SyncReport::new(id);

        // 1. Reminder store
        if let Err(e) = self.with_repository(|repo| repo.insert(&reminder)) {
            report.record(self.store_failure(StoreKind::Reminders, id, e));
        }

        // 2. Calendar mirror
        let entry = MirrorEntry::for_reminder(&reminder, now);
        let mirrored = self
            .mutate_mirror(|entries| {
                entries.retain(|e| !e.refers_to(id));
                entries.push(entry.clone());
                true
            })
            .await;
        if let Err(e) = mirrored {
            report.record(self.store_failure(StoreKind::CalendarMirror, id, e));
        }

        // 3. OS alarm
        let scheduler_id = id.scheduler_id();
        if self
            .inner
            .scheduler
            .schedule(scheduler_id, reminder.scheduled_at, reminder.payload(true))
            .await
        {
            report.scheduled = Some(scheduler_id);
        } else {
            tracing::warn!(reminder_id = %id, scheduler_id = %scheduler_id, "scheduler declined alarm");
            report.record(ReminderError::SchedulerFailure(scheduler_id));
        }

        tracing::info!(
            reminder_id = %id,
            scheduled_at = %reminder.scheduled_at,
            failures = report.failures.len(),
            "reminder created"
        );
        Ok(report)
    }

    /// Move a reminder to `new_time` and re-register its alarm under the
    /// snooze scheduler id. The logical id is unchanged.
    pub async fn snooze(
        &self,
        id: ReminderId,
        new_time: DateTime<Utc>,
    ) -> Result<SyncReport, ReminderError> {
        if new_time <= self.now() {
            return Err(ReminderError::PastSchedule {
                scheduled_at: new_time,
            });
        }

        self.inner.sound.stop();
        let mut report = SyncReport::new(id);

        // 1. Reminder store
        let record = match self.with_repository(|repo| repo.get(id)) {
            Ok(record) => record,
            Err(e) => {
                report.record(self.store_failure(StoreKind::Reminders, id, e));
                None
            }
        };
        let mut absent_from_store = false;
        match self.with_repository(|repo| repo.update_time(id, new_time)) {
            Ok(true) => {}
            Ok(false) => {
                absent_from_store = true;
                report.record(self.store_failure(
                    StoreKind::Reminders,
                    id,
                    DbError::ReminderNotFound(id.get()),
                ));
            }
            Err(e) => report.record(self.store_failure(StoreKind::Reminders, id, e)),
        }

        // 2. Calendar mirror, in place
        let mut mirrored_title = None;
        let mirrored = self
            .mutate_mirror(|entries| {
                let mut changed = false;
                for entry in entries.iter_mut().filter(|e| e.refers_to(id)) {
                    entry.set_time(new_time);
                    entry.has_alarm = true;
                    mirrored_title = Some(entry.title.clone());
                    changed = true;
                }
                changed
            })
            .await;
        let absent_from_mirror = matches!(mirrored, Ok(MirrorMutation::Unchanged));
        if let Err(e) = mirrored {
            report.record(self.store_failure(StoreKind::CalendarMirror, id, e));
        }

        // 3. OS alarm: drop the original, register the snooze alarm
        let original = id.scheduler_id();
        self.inner.scheduler.cancel(original).await;
        report.cancelled.push(original);

        // Dismissed elsewhere in the meantime: nothing left to re-arm.
        if absent_from_store && absent_from_mirror {
            tracing::info!(reminder_id = %id, "reminder no longer exists, snooze not armed");
            return Ok(report);
        }

        let payload = match record {
            Some(record) => record.payload(true),
            None => AlarmPayload {
                logical_id: id,
                title: mirrored_title.unwrap_or_else(|| UNTITLED.to_string()),
                description: None,
                full_screen: true,
            },
        };
        let snooze_id = id.snooze_scheduler_id();
        if self.inner.scheduler.schedule(snooze_id, new_time, payload).await {
            report.scheduled = Some(snooze_id);
        } else {
            tracing::warn!(reminder_id = %id, scheduler_id = %snooze_id, "scheduler declined snooze alarm");
            report.record(ReminderError::SchedulerFailure(snooze_id));
        }

        tracing::info!(reminder_id = %id, until = %new_time, "reminder snoozed");
        Ok(report)
    }

    /// Remove a reminder from all stores and cancel its alarms. Irreversible.
    pub async fn dismiss(&self, id: ReminderId) -> Result<SyncReport, ReminderError> {
        self.inner.sound.stop();
        let mut report = SyncReport::new(id);

        // 1. Reminder store. The record decides whether a snooze alarm exists;
        // the snooze id may be another reminder's primary id.
        let snoozed = match self.with_repository(|repo| repo.get(id)) {
            Ok(Some(record)) => {
                record.state == ReminderState::Snoozed || record.snooze_generation > 0
            }
            Ok(None) => false,
            Err(_) => true,
        };
        match self.with_repository(|repo| repo.delete(id)) {
            Ok(found) => {
                if !found {
                    tracing::debug!(reminder_id = %id, "reminder already absent from store");
                }
            }
            Err(e) => report.record(self.store_failure(StoreKind::Reminders, id, e)),
        }

        // 2. Calendar mirror
        let mirrored = self
            .mutate_mirror(|entries| {
                let before = entries.len();
                entries.retain(|e| !e.refers_to(id));
                entries.len() != before
            })
            .await;
        if let Err(e) = mirrored {
            report.record(self.store_failure(StoreKind::CalendarMirror, id, e));
        }

        // 3. OS alarms, including a pending snooze alarm
        let mut alarms = vec![id.scheduler_id()];
        if snoozed {
            alarms.push(id.snooze_scheduler_id());
        }
        for scheduler_id in alarms {
            self.inner.scheduler.cancel(scheduler_id).await;
            report.cancelled.push(scheduler_id);
        }

        tracing::info!(reminder_id = %id, "reminder dismissed");
        Ok(report)
    }

    /// Bring the mirror and the OS scheduler back in line with the reminder store.
    ///
    /// Every active reminder in the future gets its alarm re-registered and a
    /// mirror entry if it lacks one; alarm-bearing mirror entries without a
    /// backing reminder are dropped.
    pub async fn reconcile(&self) -> Result<ReconcileReport, ReminderError> {
        let now = self.now();
        let active = self
            .with_repository(|repo| repo.list_active())
            .map_err(|e| ReminderError::store_write(StoreKind::Reminders, e.to_string()))?;

        let mut report = ReconcileReport::default();

        let mut added = 0;
        let mut removed = 0;
        let mut rewritten = 0;
        let mirrored = self
            .mutate_mirror(|entries| {
                added = 0;
                rewritten = 0;
                let before = entries.len();
                entries.retain(|e| {
                    !e.has_alarm
                        || e.id.canonical().is_none()
                        || active.iter().any(|r| e.refers_to(r.id))
                });

                for reminder in &active {
                    match heal_entries(entries, reminder) {
                        Healed::Missing => {
                            entries.push(MirrorEntry::for_reminder(reminder, now));
                            added += 1;
                        }
                        Healed::Rewritten => rewritten += 1,
                        Healed::Intact => {}
                    }
                }
                removed = (before + added).saturating_sub(entries.len());
                added > 0 || removed > 0 || rewritten > 0
            })
            .await;
        match mirrored {
            Ok(_) => {
                report.mirror_added = added;
                report.mirror_removed = removed;
                report.mirror_rewritten = rewritten;
            }
            Err(e) => report.failures.push(ReminderError::store_write(
                StoreKind::CalendarMirror,
                e.to_string(),
            )),
        }

        for reminder in active.iter().filter(|r| r.scheduled_at > now) {
            let scheduler_id = reminder.active_scheduler_id();
            if self
                .inner
                .scheduler
                .schedule(scheduler_id, reminder.scheduled_at, reminder.payload(true))
                .await
            {
                report.rescheduled += 1;
            } else {
                report.failures.push(ReminderError::SchedulerFailure(scheduler_id));
            }
        }

        tracing::info!(
            rescheduled = report.rescheduled,
            mirror_added = report.mirror_added,
            mirror_removed = report.mirror_removed,
            mirror_rewritten = report.mirror_rewritten,
            failures = report.failures.len(),
            "reminders reconciled"
        );
        Ok(report)
    }

    /// Reminders whose time has passed without a dismiss or snooze.
    pub fn overdue(&self) -> Result<Vec<Reminder>, ReminderError> {
        let now = self.now();
        self.with_repository(|repo| repo.list_due(now))
            .map_err(|e| ReminderError::store_write(StoreKind::Reminders, e.to_string()))
    }

    /// Look up a reminder by logical id.
    pub fn get(&self, id: ReminderId) -> Result<Option<Reminder>, ReminderError> {
        self.with_repository(|repo| repo.get(id))
            .map_err(|e| ReminderError::store_write(StoreKind::Reminders, e.to_string()))
    }

    // === Private methods ===

    fn with_repository<T>(
        &self,
        f: impl FnOnce(&(dyn ReminderRepository + Send)) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let repo = self.inner.repository.lock().map_err(|_| DbError::Poisoned)?;
        f(&*repo)
    }

    async fn mutate_mirror<F>(&self, mutate: F) -> Result<MirrorMutation, MirrorError>
    where
        F: FnMut(&mut Vec<MirrorEntry>) -> bool + Send,
    {
        mutate_mirror(self.inner.mirror.as_ref(), self.inner.mirror_attempts, mutate).await
    }

    fn store_failure(
        &self,
        store: StoreKind,
        id: ReminderId,
        error: impl std::fmt::Display,
    ) -> ReminderError {
        tracing::warn!(reminder_id = %id, store = %store, error = %error, "store write failed");
        ReminderError::store_write(store, error.to_string())
    }
}

enum Healed {
    Missing,
    Rewritten,
    Intact,
}

/// Bring the entries for one reminder down to a single entry matching the store.
///
/// The exact-id entry is kept in preference to legacy forms; the others are dropped.
fn heal_entries(entries: &mut Vec<MirrorEntry>, reminder: &Reminder) -> Healed {
    let matching: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.refers_to(reminder.id))
        .map(|(i, _)| i)
        .collect();
    let Some(&first) = matching.first() else {
        return Healed::Missing;
    };
    let keep = matching
        .iter()
        .copied()
        .find(|&i| entries[i].id.canonical() == Some(reminder.id))
        .unwrap_or(first);

    let mut healed = entries[keep].clone();
    healed.id = LegacyId::from(reminder.id);
    healed.title = reminder.title.clone();
    healed.set_time(reminder.scheduled_at);
    healed.has_alarm = true;
    let changed = healed != entries[keep] || matching.len() > 1;
    entries[keep] = healed;

    for &i in matching.iter().rev().filter(|&&i| i != keep) {
        entries.remove(i);
    }
    if changed {
        Healed::Rewritten
    } else {
        Healed::Intact
    }
}
