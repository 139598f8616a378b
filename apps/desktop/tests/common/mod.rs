//! Common test utilities for integration tests.
//!
//! Stores are real (in-memory SQLite); the OS-facing collaborators are
//! recording fakes so tests can assert exactly what was asked of them.

#![allow(dead_code)]

pub mod fixtures;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use alarm_core::clock::FixedClock;
use alarm_core::error::ReminderError;
use alarm_core::mirror::MirrorEntry;
use alarm_core::presentation::SurfaceKind;
use alarm_core::types::{AlarmPayload, Reminder, ReminderId, SchedulerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use loanbook_lib::cleanup::CleanupSweeper;
use loanbook_lib::db::{DbError, ReminderRepository, SharedRepository, SqliteRepository};
use loanbook_lib::mirror::{CalendarMirror, MirrorError, MirrorSnapshot, SqliteKvMirror};
use loanbook_lib::presentation::{
    AlarmPresentationGate, AlarmSurface, AlertSound, AuthSession, DeviceLock, GateConfig,
};
use loanbook_lib::scheduler::{NotificationScheduler, PermissionStatus};
use loanbook_lib::sync::{SyncCoordinator, DEFAULT_MIRROR_ATTEMPTS};

/// One call made against the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerCall {
    Schedule {
        id: SchedulerId,
        fire_at: DateTime<Utc>,
        payload: AlarmPayload,
    },
    Cancel(SchedulerId),
}

/// Scheduler that records calls instead of setting alarms.
pub struct RecordingScheduler {
    granted: AtomicBool,
    accepts: AtomicBool,
    calls: Mutex<Vec<SchedulerCall>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self {
            granted: AtomicBool::new(true),
            accepts: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn deny_permission(&self) {
        self.granted.store(false, Ordering::SeqCst);
    }

    /// Make every schedule call report that the OS ignored it.
    pub fn decline_alarms(&self) {
        self.accepts.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scheduled(&self) -> Vec<(SchedulerId, DateTime<Utc>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SchedulerCall::Schedule { id, fire_at, .. } => Some((id, fire_at)),
                SchedulerCall::Cancel(_) => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> Vec<SchedulerId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SchedulerCall::Cancel(id) => Some(id),
                SchedulerCall::Schedule { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl NotificationScheduler for RecordingScheduler {
    async fn request_permission(&self) -> PermissionStatus {
        if self.granted.load(Ordering::SeqCst) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    async fn schedule(&self, id: SchedulerId, fire_at: DateTime<Utc>, payload: AlarmPayload) -> bool {
        self.calls.lock().unwrap().push(SchedulerCall::Schedule {
            id,
            fire_at,
            payload,
        });
        self.accepts.load(Ordering::SeqCst)
    }

    async fn cancel(&self, id: SchedulerId) {
        self.calls.lock().unwrap().push(SchedulerCall::Cancel(id));
    }
}

/// Repository whose every call fails.
pub struct FailingRepository;

impl ReminderRepository for FailingRepository {
    fn insert(&self, _: &Reminder) -> Result<(), DbError> {
        Err(DbError::Poisoned)
    }
    fn get(&self, _: ReminderId) -> Result<Option<Reminder>, DbError> {
        Err(DbError::Poisoned)
    }
    fn update_time(&self, _: ReminderId, _: DateTime<Utc>) -> Result<bool, DbError> {
        Err(DbError::Poisoned)
    }
    fn delete(&self, _: ReminderId) -> Result<bool, DbError> {
        Err(DbError::Poisoned)
    }
    fn list_active(&self) -> Result<Vec<Reminder>, DbError> {
        Err(DbError::Poisoned)
    }
    fn list_due(&self, _: DateTime<Utc>) -> Result<Vec<Reminder>, DbError> {
        Err(DbError::Poisoned)
    }
    fn count_past(&self, _: DateTime<Utc>) -> Result<usize, DbError> {
        Err(DbError::Poisoned)
    }
    fn delete_past(&self, _: DateTime<Utc>) -> Result<usize, DbError> {
        Err(DbError::Poisoned)
    }
}

/// Mirror that cannot be read or written.
pub struct UnavailableMirror;

#[async_trait]
impl CalendarMirror for UnavailableMirror {
    async fn load_all(&self) -> Result<MirrorSnapshot, MirrorError> {
        Err(MirrorError::Unavailable("preferences locked".to_string()))
    }

    async fn replace_all(&self, _: Vec<MirrorEntry>, _: u64) -> Result<u64, MirrorError> {
        Err(MirrorError::Unavailable("preferences locked".to_string()))
    }
}

/// Everything the gate did, in order, across its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum GateEvent {
    Show(SurfaceKind, ReminderId),
    Hide(ReminderId),
    ExitToLockScreen,
    ReturnToMain,
    Logout,
    SoundPlay,
    SoundStop,
}

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<GateEvent>>>);

impl EventLog {
    fn push(&self, event: GateEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<GateEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &GateEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    pub fn contains(&self, event: &GateEvent) -> bool {
        self.count(event) > 0
    }

    pub fn position(&self, event: &GateEvent) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

pub struct RecordingSurface(pub EventLog);

#[async_trait]
impl AlarmSurface for RecordingSurface {
    async fn show(&self, kind: SurfaceKind, payload: &AlarmPayload) {
        self.0.push(GateEvent::Show(kind, payload.logical_id));
    }
    async fn hide(&self, id: ReminderId) {
        self.0.push(GateEvent::Hide(id));
    }
    async fn exit_to_lock_screen(&self) {
        self.0.push(GateEvent::ExitToLockScreen);
    }
    async fn return_to_main(&self) {
        self.0.push(GateEvent::ReturnToMain);
    }
}

/// Surface whose hide takes a few scheduler turns to finish.
pub struct SlowHideSurface(pub EventLog);

#[async_trait]
impl AlarmSurface for SlowHideSurface {
    async fn show(&self, kind: SurfaceKind, payload: &AlarmPayload) {
        self.0.push(GateEvent::Show(kind, payload.logical_id));
    }
    async fn hide(&self, id: ReminderId) {
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.0.push(GateEvent::Hide(id));
    }
    async fn exit_to_lock_screen(&self) {
        self.0.push(GateEvent::ExitToLockScreen);
    }
    async fn return_to_main(&self) {
        self.0.push(GateEvent::ReturnToMain);
    }
}

pub struct RecordingAuth(pub EventLog);

#[async_trait]
impl AuthSession for RecordingAuth {
    async fn logout(&self) {
        self.0.push(GateEvent::Logout);
    }
}

pub struct RecordingSound(pub EventLog);

impl AlertSound for RecordingSound {
    fn play(&self) {
        self.0.push(GateEvent::SoundPlay);
    }
    fn stop(&self) {
        self.0.push(GateEvent::SoundStop);
    }
}

/// Lock query with a scripted answer; `None` makes the query fail.
pub struct ScriptedLock(pub Option<bool>);

#[async_trait]
impl DeviceLock for ScriptedLock {
    async fn is_locked(&self) -> Result<bool, ReminderError> {
        self.0
            .ok_or_else(|| ReminderError::LockQuery("keyguard service unavailable".to_string()))
    }
}

/// Coordinator over in-memory stores, a recording scheduler and a fixed clock.
pub struct TestContext {
    pub repository: SharedRepository,
    pub mirror: Arc<SqliteKvMirror>,
    pub scheduler: Arc<RecordingScheduler>,
    pub clock: Arc<FixedClock>,
    pub log: EventLog,
    pub coordinator: SyncCoordinator,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_repository(SqliteRepository::open_in_memory().unwrap().into_shared())
    }

    pub fn with_repository(repository: SharedRepository) -> Self {
        Self::build(repository, Arc::new(SqliteKvMirror::open_in_memory().unwrap()), None)
    }

    /// Coordinator whose mirror writes go to `mirror` instead of the in-memory store.
    pub fn with_mirror(mirror: Arc<dyn CalendarMirror>) -> Self {
        Self::build(
            SqliteRepository::open_in_memory().unwrap().into_shared(),
            Arc::new(SqliteKvMirror::open_in_memory().unwrap()),
            Some(mirror),
        )
    }

    fn build(
        repository: SharedRepository,
        mirror: Arc<SqliteKvMirror>,
        mirror_override: Option<Arc<dyn CalendarMirror>>,
    ) -> Self {
        let scheduler = Arc::new(RecordingScheduler::new());
        let clock = Arc::new(FixedClock::new(fixtures::base_time()));
        let log = EventLog::default();
        let coordinator = SyncCoordinator::with_options(
            repository.clone(),
            mirror_override.unwrap_or_else(|| mirror.clone() as Arc<dyn CalendarMirror>),
            scheduler.clone(),
            clock.clone(),
            Arc::new(RecordingSound(log.clone())),
            DEFAULT_MIRROR_ATTEMPTS,
        );
        Self {
            repository,
            mirror,
            scheduler,
            clock,
            log,
            coordinator,
        }
    }

    /// Gate over this context's coordinator with a scripted lock answer.
    pub fn gate(&self, locked: Option<bool>) -> AlarmPresentationGate {
        self.gate_with_surface(locked, Arc::new(RecordingSurface(self.log.clone())))
    }

    pub fn gate_with_surface(
        &self,
        locked: Option<bool>,
        surface: Arc<dyn AlarmSurface>,
    ) -> AlarmPresentationGate {
        AlarmPresentationGate::new(
            self.coordinator.clone(),
            Arc::new(ScriptedLock(locked)),
            Arc::new(RecordingAuth(self.log.clone())),
            surface,
            Arc::new(RecordingSound(self.log.clone())),
            GateConfig::default(),
        )
    }

    pub fn sweeper(&self) -> CleanupSweeper {
        CleanupSweeper::new(self.repository.clone(), self.mirror.clone(), self.clock.clone())
    }

    pub fn stored(&self, id: ReminderId) -> Option<Reminder> {
        self.repository.lock().unwrap().get(id).unwrap()
    }

    pub async fn mirror_entries(&self) -> Vec<MirrorEntry> {
        self.mirror.load_all().await.unwrap().entries
    }

    /// Create a reminder and clear the recorded scheduler calls.
    pub async fn seed(&self, reminder: Reminder) {
        self.coordinator.create(reminder).await.unwrap();
        self.scheduler.clear();
    }
}
