//! Core types for reminder alarms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::identity::{derive_scheduler_id, derive_snooze_scheduler_id};

/// Logical identity of a reminder record.
///
/// Usually the creation time in epoch milliseconds. This is the only id the
/// stores key on; scheduler ids are always derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderId(i64);

impl ReminderId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Id minted from a creation timestamp.
    pub fn from_timestamp(created_at: DateTime<Utc>) -> Self {
        Self(created_at.timestamp_millis())
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Scheduler id of the primary OS alarm.
    pub fn scheduler_id(self) -> SchedulerId {
        derive_scheduler_id(self.0)
    }

    /// Scheduler id of the alarm registered after a snooze.
    pub fn snooze_scheduler_id(self) -> SchedulerId {
        derive_scheduler_id(derive_snooze_scheduler_id(self.0))
    }
}

impl fmt::Display for ReminderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReminderId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

impl From<i64> for ReminderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Bounded 32-bit id required by the OS notification scheduler.
///
/// Always in `0..=2_147_483_647`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SchedulerId(i32);

impl SchedulerId {
    pub(crate) fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for SchedulerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    Scheduled,
    Firing,
    Snoozed,
    Dismissed,
}

impl Default for ReminderState {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl ReminderState {
    /// Get the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Firing => "firing",
            Self::Snoozed => "snoozed",
            Self::Dismissed => "dismissed",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "firing" => Some(Self::Firing),
            "snoozed" => Some(Self::Snoozed),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }

    /// Whether a live OS alarm should exist for this state.
    pub fn expects_alarm(self) -> bool {
        matches!(self, Self::Scheduled | Self::Snoozed)
    }
}

/// A time-based alert owned by the reminder store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub state: ReminderState,
    pub snooze_generation: u32,
}

impl Reminder {
    /// Create a freshly scheduled reminder.
    pub fn new(id: ReminderId, title: impl Into<String>, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            scheduled_at,
            state: ReminderState::Scheduled,
            snooze_generation: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Scheduler id the live OS alarm is registered under.
    pub fn active_scheduler_id(&self) -> SchedulerId {
        match self.state {
            ReminderState::Snoozed => self.id.snooze_scheduler_id(),
            _ => self.id.scheduler_id(),
        }
    }

    /// Payload delivered to the presentation gate when the alarm fires.
    pub fn payload(&self, full_screen: bool) -> AlarmPayload {
        AlarmPayload {
            logical_id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            full_screen,
        }
    }
}

/// Data handed to the OS scheduler and returned when the alarm fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmPayload {
    pub logical_id: ReminderId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub full_screen: bool,
}
