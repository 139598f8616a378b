//! Decides how a fired alarm is shown and what happens after the user acts.

use alarm_core::error::{InvalidTransition, ReminderError};
use alarm_core::presentation::{
    choose_surface, security_action, LockState, PresentationEvent, PresentationState,
    SecurityAction, SurfaceKind,
};
use alarm_core::types::{AlarmPayload, ReminderId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{AlarmSurface, AlertSound, AuthSession, DeviceLock};
use crate::sync::{OperationOutcome, SyncCoordinator, SyncReport};

/// Gate timing.
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// How long an untouched alarm stays visible.
    pub auto_hide: Duration,
    /// Snooze length when the user does not pick a time.
    pub default_snooze: chrono::Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            auto_hide: Duration::from_secs(30),
            default_snooze: chrono::Duration::minutes(10),
        }
    }
}

struct GateInner {
    coordinator: SyncCoordinator,
    lock: Arc<dyn DeviceLock>,
    auth: Arc<dyn AuthSession>,
    surface: Arc<dyn AlarmSurface>,
    sound: Arc<dyn AlertSound>,
    config: GateConfig,
    /// Visible presentations per reminder, to spot duplicate triggers.
    active: Mutex<HashMap<ReminderId, usize>>,
}

impl GateInner {
    /// Register a presentation; returns whether one was already showing.
    fn acquire(&self, id: ReminderId) -> bool {
        match self.active.lock() {
            Ok(mut active) => {
                let count = active.entry(id).or_insert(0);
                *count += 1;
                *count > 1
            }
            Err(_) => false,
        }
    }

    fn release(&self, id: ReminderId) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(count) = active.get_mut(&id) {
                *count -= 1;
                if *count == 0 {
                    active.remove(&id);
                }
            }
        }
    }
}

/// Entry point for fired alarms.
#[derive(Clone)]
pub struct AlarmPresentationGate {
    inner: Arc<GateInner>,
}

impl AlarmPresentationGate {
    pub fn new(
        coordinator: SyncCoordinator,
        lock: Arc<dyn DeviceLock>,
        auth: Arc<dyn AuthSession>,
        surface: Arc<dyn AlarmSurface>,
        sound: Arc<dyn AlertSound>,
        config: GateConfig,
    ) -> Self {
        Self {
            inner: Arc::new(GateInner {
                coordinator,
                lock,
                auth,
                surface,
                sound,
                config,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Whether any presentation for the reminder is currently visible.
    pub fn is_showing(&self, id: ReminderId) -> bool {
        self.inner
            .active
            .lock()
            .map(|active| active.contains_key(&id))
            .unwrap_or(false)
    }

    /// Present a fired alarm.
    ///
    /// The returned handle owns the auto-hide timer: dropping it tears the
    /// timer down with it.
    pub async fn present(&self, payload: AlarmPayload) -> Presentation {
        let (state, _) = watch::channel(PresentationState::Idle);
        let id = payload.logical_id;

        let lock = LockState::from_query(self.inner.lock.is_locked().await.map_err(|e| {
            tracing::warn!(reminder_id = %id, error = %e, "lock query failed, assuming locked");
            e
        }));
        let duplicate = self.inner.acquire(id);
        let kind = choose_surface(lock, payload.full_screen, duplicate);

        let shared = Arc::new(PresentationShared {
            gate: self.inner.clone(),
            payload,
            lock,
            kind,
            state,
            released: AtomicBool::new(false),
        });

        // Idle -> Firing -> surface; both are valid from a fresh state.
        let _ = shared.transition(PresentationEvent::Fire);
        let _ = shared.transition(PresentationEvent::Present(kind));

        self.inner.sound.play();
        self.inner.surface.show(kind, &shared.payload).await;
        tracing::info!(reminder_id = %id, ?kind, ?lock, duplicate, "alarm presented");

        let timer = {
            let shared = shared.clone();
            let delay = self.inner.config.auto_hide;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // Only the sleep is abortable; once the timeout lands the
                // hide runs to completion even if the handle is torn down.
                tokio::spawn(async move { shared.auto_hide().await });
            })
        };

        Presentation {
            shared,
            timer: Some(timer),
        }
    }
}

struct PresentationShared {
    gate: Arc<GateInner>,
    payload: AlarmPayload,
    lock: LockState,
    kind: SurfaceKind,
    state: watch::Sender<PresentationState>,
    released: AtomicBool,
}

impl PresentationShared {
    fn transition(&self, event: PresentationEvent) -> Result<PresentationState, InvalidTransition> {
        let mut outcome = Err(InvalidTransition {
            state: *self.state.borrow(),
            event,
        });
        self.state.send_if_modified(|state| match state.apply(event) {
            Ok(next) => {
                *state = next;
                outcome = Ok(next);
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.gate.release(self.payload.logical_id);
        }
    }

    /// Timeout with no user action: hide, but leave every store untouched.
    async fn auto_hide(&self) {
        if self.transition(PresentationEvent::Timeout).is_err() {
            return;
        }
        let id = self.payload.logical_id;
        self.gate.sound.stop();
        self.gate.surface.hide(id).await;
        self.release();
        tracing::info!(reminder_id = %id, "alarm auto-hidden, reminder kept");
    }
}

/// What followed a dismiss or snooze.
#[derive(Debug)]
pub struct ActionOutcome {
    pub state: PresentationState,
    pub security: SecurityAction,
    pub sync: Result<SyncReport, ReminderError>,
}

impl ActionOutcome {
    /// UI-facing form of the store update.
    pub fn outcome(&self) -> OperationOutcome {
        OperationOutcome::from(self.sync.clone())
    }
}

/// One firing of one alarm, from presentation to a terminal state.
pub struct Presentation {
    shared: Arc<PresentationShared>,
    timer: Option<JoinHandle<()>>,
}

impl Presentation {
    pub fn state(&self) -> PresentationState {
        *self.shared.state.borrow()
    }

    pub fn kind(&self) -> SurfaceKind {
        self.shared.kind
    }

    pub fn lock_state(&self) -> LockState {
        self.shared.lock
    }

    pub fn payload(&self) -> &AlarmPayload {
        &self.shared.payload
    }

    /// Wait until the presentation reaches a terminal state.
    pub async fn closed(&self) -> PresentationState {
        let mut rx = self.shared.state.subscribe();
        let result = rx.wait_for(|state| state.is_terminal()).await.map(|state| *state);
        result.unwrap_or_else(|_| self.state())
    }

    /// The user dismissed the alarm: delete the reminder everywhere.
    pub async fn dismiss(mut self) -> Result<ActionOutcome, InvalidTransition> {
        self.cancel_timer();
        let state = self.shared.transition(PresentationEvent::Dismiss)?;
        let id = self.shared.payload.logical_id;

        self.close_surface().await;
        let sync = self.shared.gate.coordinator.dismiss(id).await;
        let security = self.apply_security_policy().await;
        self.shared.release();

        Ok(ActionOutcome {
            state,
            security,
            sync,
        })
    }

    /// The user snoozed with the default snooze length.
    pub async fn snooze(self) -> Result<ActionOutcome, InvalidTransition> {
        let gate = &self.shared.gate;
        let until = gate.coordinator.now() + gate.config.default_snooze;
        self.snooze_until(until).await
    }

    /// The user snoozed until a chosen time.
    pub async fn snooze_until(
        mut self,
        until: DateTime<Utc>,
    ) -> Result<ActionOutcome, InvalidTransition> {
        self.cancel_timer();
        let state = self.shared.transition(PresentationEvent::Snooze)?;
        let id = self.shared.payload.logical_id;

        self.close_surface().await;
        let sync = self.shared.gate.coordinator.snooze(id, until).await;
        let security = self.apply_security_policy().await;
        self.shared.release();

        Ok(ActionOutcome {
            state,
            security,
            sync,
        })
    }

    // === Private methods ===

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    async fn close_surface(&self) {
        self.shared.gate.sound.stop();
        self.shared.gate.surface.hide(self.shared.payload.logical_id).await;
    }

    /// Locked at fire time: back to the lock screen, no auth involved.
    /// Unlocked: end the session before the main UI is reachable again.
    async fn apply_security_policy(&self) -> SecurityAction {
        let action = security_action(self.shared.lock);
        let gate = &self.shared.gate;
        match action {
            SecurityAction::ExitToLockScreen => gate.surface.exit_to_lock_screen().await,
            SecurityAction::ForceLogout => {
                gate.auth.logout().await;
                gate.surface.return_to_main().await;
            }
        }
        tracing::info!(reminder_id = %self.shared.payload.logical_id, ?action, "security policy applied");
        action
    }
}

impl Drop for Presentation {
    fn drop(&mut self) {
        self.cancel_timer();
        self.shared.release();
    }
}
