//! Application state.

use alarm_core::clock::SystemClock;
use alarm_core::types::AlarmPayload;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::cleanup::CleanupSweeper;
use crate::config::AppConfig;
use crate::db::SqliteRepository;
use crate::mirror::SqliteKvMirror;
use crate::presentation::{
    AlarmPresentationGate, HeadlessSurface, LoggingAuthSession, SilentAlertSound,
    UnavailableLockQuery,
};
use crate::scheduler::TokioScheduler;
use crate::sync::SyncCoordinator;

/// Everything the daemon drives, wired over one set of stores.
pub struct AppState {
    pub coordinator: SyncCoordinator,
    pub sweeper: CleanupSweeper,
    pub gate: AlarmPresentationGate,
    pub scheduler: TokioScheduler,
}

impl AppState {
    /// Wire the stores together. The receiver yields payloads as alarms fall due.
    pub fn new(
        repository: SqliteRepository,
        mirror: SqliteKvMirror,
        config: &AppConfig,
    ) -> (Self, UnboundedReceiver<AlarmPayload>) {
        let repository = repository.into_shared();
        let mirror = Arc::new(mirror);
        let clock = Arc::new(SystemClock);
        let sound = Arc::new(SilentAlertSound);
        let (scheduler, fired) = TokioScheduler::new(clock.clone());

        let coordinator = SyncCoordinator::with_options(
            repository.clone(),
            mirror.clone(),
            Arc::new(scheduler.clone()),
            clock.clone(),
            sound.clone(),
            config.mirror_retries,
        );
        let sweeper = CleanupSweeper::new(repository, mirror, clock)
            .with_mirror_attempts(config.mirror_retries);
        let gate = AlarmPresentationGate::new(
            coordinator.clone(),
            Arc::new(UnavailableLockQuery),
            Arc::new(LoggingAuthSession),
            Arc::new(HeadlessSurface),
            sound,
            config.gate_config(),
        );

        let state = Self {
            coordinator,
            sweeper,
            gate,
            scheduler,
        };
        (state, fired)
    }
}
