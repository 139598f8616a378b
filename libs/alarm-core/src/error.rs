//! Error types for alarm-core.

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::presentation::{PresentationEvent, PresentationState};
use crate::types::SchedulerId;

/// Result type alias using ReminderError.
pub type Result<T> = std::result::Result<T, ReminderError>;

/// The persistence layer a write was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Reminders,
    CalendarMirror,
    Scheduler,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reminders => "reminders",
            Self::CalendarMirror => "calendar_mirror",
            Self::Scheduler => "scheduler",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by reminder operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReminderError {
    #[error("reminder time {scheduled_at} is not in the future")]
    PastSchedule { scheduled_at: DateTime<Utc> },

    #[error("notification permission denied")]
    PermissionDenied,

    #[error("notification scheduler declined alarm {0}")]
    SchedulerFailure(SchedulerId),

    #[error("{store} write failed: {message}")]
    StoreWrite { store: StoreKind, message: String },

    #[error("corrupt mirror data: {0}")]
    Parse(String),

    #[error("device lock query failed: {0}")]
    LockQuery(String),
}

impl ReminderError {
    pub fn store_write(store: StoreKind, message: impl Into<String>) -> Self {
        Self::StoreWrite {
            store,
            message: message.into(),
        }
    }

    /// Whether the UI should offer the user a retry action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::StoreWrite { .. })
    }

    /// Whether the user can fix the request themselves (e.g. pick another time).
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::PastSchedule { .. } | Self::PermissionDenied)
    }
}

/// A presentation event that is not valid from the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} while {state:?}")]
pub struct InvalidTransition {
    pub state: PresentationState,
    pub event: PresentationEvent,
}
