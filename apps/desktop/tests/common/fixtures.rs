//! Test fixtures and factory functions for creating test data.

use alarm_core::mirror::MirrorEntry;
use alarm_core::types::{Reminder, ReminderId};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// The instant every test clock starts at.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 15, 12, 0, 0).unwrap()
}

/// A reminder due `offset` after [`base_time`].
pub fn reminder(id: i64, offset: Duration) -> Reminder {
    Reminder::new(ReminderId::new(id), format!("Reminder {id}"), base_time() + offset)
        .with_description("Repayment due")
}

/// Mirror entry for a reminder at `at`, created at [`base_time`].
pub fn mirror_entry(id: i64, at: DateTime<Utc>) -> MirrorEntry {
    MirrorEntry::for_reminder(
        &Reminder::new(ReminderId::new(id), format!("Entry {id}"), at),
        base_time(),
    )
}

/// Logical id in the creation-timestamp form the app generates.
pub const TIMESTAMP_ID: i64 = 1_700_000_000_000;
