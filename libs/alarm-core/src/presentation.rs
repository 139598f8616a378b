//! State machine for a fired alarm.
//!
//! ```text
//!          fire            present(kind)
//!  Idle ─────────► Firing ───────────────► FullScreen | Popup
//!                                              │
//!                    dismiss ┌─────────────────┼───────────────┐ timeout
//!                            ▼                 ▼ snooze        ▼
//!                        Dismissed          Snoozed        AutoHidden
//! ```
//!
//! `Dismissed`, `Snoozed` and `AutoHidden` are terminal for the current
//! firing. Once terminal, every further event is rejected, so a timeout racing
//! a user action resolves to whichever arrives first.

use serde::{Deserialize, Serialize};

use crate::error::InvalidTransition;

/// Where the presentation of one firing currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationState {
    Idle,
    Firing,
    FullScreen,
    Popup,
    Dismissed,
    Snoozed,
    AutoHidden,
}

/// Inputs driving the presentation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationEvent {
    Fire,
    Present(SurfaceKind),
    Dismiss,
    Snooze,
    Timeout,
}

/// The surface an alarm is shown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    FullScreen,
    Popup,
}

impl Default for PresentationState {
    fn default() -> Self {
        Self::Idle
    }
}

impl PresentationState {
    /// Apply an event, returning the next state.
    pub fn apply(self, event: PresentationEvent) -> Result<Self, InvalidTransition> {
        use PresentationEvent as E;
        use PresentationState as S;

        let next = match (self, event) {
            (S::Idle, E::Fire) => S::Firing,
            (S::Firing, E::Present(SurfaceKind::FullScreen)) => S::FullScreen,
            (S::Firing, E::Present(SurfaceKind::Popup)) => S::Popup,
            (S::FullScreen | S::Popup, E::Dismiss) => S::Dismissed,
            (S::FullScreen | S::Popup, E::Snooze) => S::Snoozed,
            (S::FullScreen | S::Popup, E::Timeout) => S::AutoHidden,
            (state, event) => return Err(InvalidTransition { state, event }),
        };
        Ok(next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Dismissed | Self::Snoozed | Self::AutoHidden)
    }

    pub fn is_visible(self) -> bool {
        matches!(self, Self::FullScreen | Self::Popup)
    }
}

/// Device lock state as seen at fire time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Locked,
    Unlocked,
    /// The lock query failed.
    Unknown,
}

impl LockState {
    /// Interpret a lock query result. A failed query yields `Unknown`.
    pub fn from_query<E>(result: Result<bool, E>) -> Self {
        match result {
            Ok(true) => Self::Locked,
            Ok(false) => Self::Unlocked,
            Err(_) => Self::Unknown,
        }
    }

    /// Unknown is treated as locked.
    pub fn treat_as_locked(self) -> bool {
        !matches!(self, Self::Unlocked)
    }
}

/// What to do with the app after the user acted on an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityAction {
    /// Leave the app surface and hand control back to the OS lock screen.
    ExitToLockScreen,
    /// End the authenticated session before the main UI is reachable.
    ForceLogout,
}

/// Pick the surface for a firing.
///
/// A locked (or unknown) device always gets the full-screen surface. Otherwise
/// full-screen is used for primary alerts and the popup for secondary or
/// duplicate triggers.
pub fn choose_surface(lock: LockState, full_screen_requested: bool, duplicate: bool) -> SurfaceKind {
    if lock.treat_as_locked() || (full_screen_requested && !duplicate) {
        SurfaceKind::FullScreen
    } else {
        SurfaceKind::Popup
    }
}

/// Security policy applied after a dismiss or snooze.
pub fn security_action(lock: LockState) -> SecurityAction {
    if lock.treat_as_locked() {
        SecurityAction::ExitToLockScreen
    } else {
        SecurityAction::ForceLogout
    }
}
