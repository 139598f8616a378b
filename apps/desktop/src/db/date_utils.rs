//! Date utilities for local calendar days.

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};

/// Local calendar day containing `now`.
pub fn local_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Local).date_naive()
}

/// Start of the local calendar day containing `now`, as a UTC instant.
///
/// If local midnight does not exist (a DST gap at midnight), the earliest
/// valid instant of the day is used.
pub fn start_of_local_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = local_today(now);
    let mut candidate = today.and_hms_opt(0, 0, 0).unwrap_or_default();
    for _ in 0..4 {
        if let Some(start) = Local.from_local_datetime(&candidate).earliest() {
            return start.with_timezone(&Utc);
        }
        candidate += Duration::minutes(30);
    }
    now
}
