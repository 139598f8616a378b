//! Core reminder-alarm library shared by the desktop application.
//!
//! Provides:
//! - Canonical reminder identity and the bounded scheduler id mapping
//! - Legacy id matching for calendar mirror entries
//! - The alarm presentation state machine and security policy
//! - Shared types (Reminder, ReminderState, AlarmPayload, MirrorEntry)

pub mod clock;
pub mod error;
pub mod identity;
pub mod mirror;
pub mod presentation;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{InvalidTransition, ReminderError, Result, StoreKind};
pub use identity::{derive_scheduler_id, derive_snooze_scheduler_id, matches, LegacyId};
pub use mirror::MirrorEntry;
pub use presentation::{
    choose_surface, security_action, LockState, PresentationEvent, PresentationState,
    SecurityAction, SurfaceKind,
};
pub use types::{AlarmPayload, Reminder, ReminderId, ReminderState, SchedulerId};
