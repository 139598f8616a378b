//! Denormalized reminder entries shown by the calendar view.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{matches, LegacyId};
use crate::types::{Reminder, ReminderId};

/// One calendar entry, persisted as part of a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorEntry {
    pub id: LegacyId,
    pub title: String,
    pub date: String,
    pub time_hour: u32,
    pub time_minute: u32,
    pub created_at: String,
    #[serde(default)]
    pub has_alarm: bool,
}

impl MirrorEntry {
    /// Build the calendar shadow of a reminder.
    pub fn for_reminder(reminder: &Reminder, created_at: DateTime<Utc>) -> Self {
        let mut entry = Self {
            id: LegacyId::from(reminder.id),
            title: reminder.title.clone(),
            date: String::new(),
            time_hour: 0,
            time_minute: 0,
            created_at: format_timestamp(created_at),
            has_alarm: true,
        };
        entry.set_time(reminder.scheduled_at);
        entry
    }

    /// Move the entry to a new local date and time.
    pub fn set_time(&mut self, at: DateTime<Utc>) {
        let local = at.with_timezone(&Local);
        self.date = format_date(local.date_naive());
        self.time_hour = local.hour();
        self.time_minute = local.minute();
    }

    pub fn refers_to(&self, id: ReminderId) -> bool {
        matches(&self.id, id)
    }

    /// Local calendar day of the entry, if the stored date parses.
    pub fn local_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    /// Parse a persisted collection.
    pub fn parse_collection(raw: &str) -> serde_json::Result<Vec<MirrorEntry>> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(raw)
    }

    /// Serialize a collection for persistence.
    pub fn to_collection(entries: &[MirrorEntry]) -> serde_json::Result<String> {
        serde_json::to_string(entries)
    }
}

/// Midnight of the given day in the mirror's ISO-8601 form.
fn format_date(date: NaiveDate) -> String {
    format!("{}T00:00:00.000", date.format("%Y-%m-%d"))
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.3f")
        .to_string()
}

/// Accepts full RFC 3339, naive date-times with or without fractions, and bare dates.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
