//! Notification scheduler interface and an in-process implementation.

use alarm_core::clock::Clock;
use alarm_core::types::{AlarmPayload, SchedulerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Result of asking for notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// OS-level alarm scheduler.
///
/// Scheduling is reported through a boolean: `false` means the OS declined
/// or silently ignored the request.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    /// Request (or verify) permission to post alarms.
    async fn request_permission(&self) -> PermissionStatus;

    /// Register an alarm, replacing any alarm under the same id.
    async fn schedule(&self, id: SchedulerId, fire_at: DateTime<Utc>, payload: AlarmPayload) -> bool;

    async fn cancel(&self, id: SchedulerId);
}

/// Scheduler backed by tokio timers.
///
/// Due payloads are delivered on the channel returned by [`TokioScheduler::new`].
/// Delays are measured against the same clock the coordinator validates with.
#[derive(Clone)]
pub struct TokioScheduler {
    inner: Arc<TokioSchedulerInner>,
}

struct TokioSchedulerInner {
    pending: Mutex<HashMap<SchedulerId, JoinHandle<()>>>,
    fired: UnboundedSender<AlarmPayload>,
    clock: Arc<dyn Clock>,
}

impl TokioScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, UnboundedReceiver<AlarmPayload>) {
        let (fired, receiver) = unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(TokioSchedulerInner {
                pending: Mutex::new(HashMap::new()),
                fired,
                clock,
            }),
        };
        (scheduler, receiver)
    }

    /// Number of alarms waiting to fire.
    pub fn pending_count(&self) -> usize {
        self.inner
            .pending
            .lock()
            .map(|pending| pending.values().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl NotificationScheduler for TokioScheduler {
    async fn request_permission(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn schedule(&self, id: SchedulerId, fire_at: DateTime<Utc>, payload: AlarmPayload) -> bool {
        let delay = match (fire_at - self.inner.clock.now()).to_std() {
            Ok(delay) => delay,
            Err(_) => {
                tracing::warn!(scheduler_id = %id, %fire_at, "refusing to schedule alarm in the past");
                return false;
            }
        };

        let Ok(mut pending) = self.inner.pending.lock() else {
            return false;
        };

        let fired = self.inner.fired.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(scheduler_id = %id, reminder_id = %payload.logical_id, "alarm due");
            let _ = fired.send(payload);
        });

        if let Some(previous) = pending.insert(id, handle) {
            previous.abort();
        }
        pending.retain(|_, handle| !handle.is_finished());
        true
    }

    async fn cancel(&self, id: SchedulerId) {
        if let Ok(mut pending) = self.inner.pending.lock() {
            if let Some(handle) = pending.remove(&id) {
                handle.abort();
                tracing::debug!(scheduler_id = %id, "alarm cancelled");
            }
        }
    }
}
