//! Collaborators for running without a windowing system.

use alarm_core::error::ReminderError;
use alarm_core::presentation::SurfaceKind;
use alarm_core::types::{AlarmPayload, ReminderId};
use async_trait::async_trait;

use super::{AlarmSurface, AuthSession, DeviceLock};

/// Surface that writes alarms to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessSurface;

#[async_trait]
impl AlarmSurface for HeadlessSurface {
    async fn show(&self, kind: SurfaceKind, payload: &AlarmPayload) {
        tracing::info!(
            reminder_id = %payload.logical_id,
            title = %payload.title,
            description = payload.description.as_deref().unwrap_or(""),
            ?kind,
            "ALARM"
        );
    }

    async fn hide(&self, id: ReminderId) {
        tracing::debug!(reminder_id = %id, "alarm hidden");
    }

    async fn exit_to_lock_screen(&self) {
        tracing::info!("returning control to the lock screen");
    }

    async fn return_to_main(&self) {
        tracing::debug!("returning to main view");
    }
}

/// No lock query is available here, so every alarm is handled as locked.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLockQuery;

#[async_trait]
impl DeviceLock for UnavailableLockQuery {
    async fn is_locked(&self) -> Result<bool, ReminderError> {
        Err(ReminderError::LockQuery(
            "no lock state source on this platform".to_string(),
        ))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAuthSession;

#[async_trait]
impl AuthSession for LoggingAuthSession {
    async fn logout(&self) {
        tracing::info!("session ended after alarm action");
    }
}
