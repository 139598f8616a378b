//! Reports returned by the coordinator and their UI-facing form.

use alarm_core::error::ReminderError;
use alarm_core::types::{ReminderId, SchedulerId};
use serde::Serialize;

/// What a coordinator operation did, including any per-store failures.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub reminder_id: ReminderId,
    /// Scheduler id an alarm was registered under, if any.
    pub scheduled: Option<SchedulerId>,
    pub cancelled: Vec<SchedulerId>,
    /// Writes that failed without stopping the operation.
    pub failures: Vec<ReminderError>,
}

impl SyncReport {
    pub fn new(reminder_id: ReminderId) -> Self {
        Self {
            reminder_id,
            scheduled: None,
            cancelled: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, failure: ReminderError) {
        self.failures.push(failure);
    }

    /// Every store accepted its write.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of a full reconcile pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub rescheduled: usize,
    pub mirror_added: usize,
    pub mirror_removed: usize,
    /// Entries rewritten to match the store.
    pub mirror_rewritten: usize,
    pub failures: Vec<ReminderError>,
}

/// Success flag and optional message handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub retry_available: bool,
}

impl From<Result<SyncReport, ReminderError>> for OperationOutcome {
    fn from(result: Result<SyncReport, ReminderError>) -> Self {
        match result {
            // Store failures heal on the next reload, so they stay silent here.
            Ok(_) => Self {
                success: true,
                message: None,
                retry_available: false,
            },
            Err(e) => Self {
                success: false,
                message: Some(e.to_string()),
                retry_available: e.is_retryable(),
            },
        }
    }
}
