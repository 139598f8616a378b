//! Presentation of fired alarms and the collaborators it drives.

mod gate;
mod headless;

pub use gate::{ActionOutcome, AlarmPresentationGate, GateConfig, Presentation};
pub use headless::{HeadlessSurface, LoggingAuthSession, UnavailableLockQuery};

use alarm_core::error::ReminderError;
use alarm_core::presentation::SurfaceKind;
use alarm_core::types::{AlarmPayload, ReminderId};
use async_trait::async_trait;

/// Device lock query. May fail; callers treat failure as locked.
#[async_trait]
pub trait DeviceLock: Send + Sync {
    async fn is_locked(&self) -> Result<bool, ReminderError>;
}

/// The authenticated app session.
#[async_trait]
pub trait AuthSession: Send + Sync {
    /// End the session so credentials are required before the main UI.
    async fn logout(&self);
}

/// The UI that shows alarms.
#[async_trait]
pub trait AlarmSurface: Send + Sync {
    async fn show(&self, kind: SurfaceKind, payload: &AlarmPayload);
    async fn hide(&self, id: ReminderId);
    /// Leave the app and hand control back to the OS lock screen.
    async fn exit_to_lock_screen(&self);
    async fn return_to_main(&self);
}

/// Alert tone playback.
pub trait AlertSound: Send + Sync {
    fn play(&self);
    fn stop(&self);
}

/// No audio output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAlertSound;

impl AlertSound for SilentAlertSound {
    fn play(&self) {}
    fn stop(&self) {}
}
