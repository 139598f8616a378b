//! Mapping between logical reminder ids and OS scheduler ids.
//!
//! The OS scheduler only accepts 32-bit ids, while reminders are keyed by
//! millisecond timestamps. Every schedule, cancel and lookup path derives the
//! scheduler id from the logical id with [`derive_scheduler_id`]; the result is
//! never stored on its own.
//!
//! Older calendar mirror data keyed entries by the raw integer, by its string
//! form, or by the bounded scheduler id. [`LegacyId`] carries whichever form
//! was read, and [`matches`] accepts all three.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::types::{ReminderId, SchedulerId};

/// Modulus bounding logical ids into the scheduler's id space.
pub const SCHEDULER_ID_MODULUS: u64 = 2_147_483_647;

/// Offset applied to the logical id for the alarm registered after a snooze.
pub const SNOOZE_ID_OFFSET: i64 = 1000;

/// Bounded scheduler id for a logical id: `|id| mod 2_147_483_647`.
pub fn derive_scheduler_id(id: i64) -> SchedulerId {
    let bounded = id.unsigned_abs() % SCHEDULER_ID_MODULUS;
    // bounded < 2^31 - 1, so it always fits
    SchedulerId::new(bounded as i32)
}

/// Unbounded id of the alarm registered after a snooze: `id + 1000`.
///
/// Callers bound it with [`derive_scheduler_id`] at the scheduler boundary.
pub fn derive_snooze_scheduler_id(id: i64) -> i64 {
    id.wrapping_add(SNOOZE_ID_OFFSET)
}

/// Whether a stored id refers to the given logical reminder.
///
/// True for exact integer equality, string equality with the decimal form,
/// or equal bounded scheduler ids.
pub fn matches(candidate: &LegacyId, id: ReminderId) -> bool {
    match candidate {
        LegacyId::Int(value) => {
            *value == id.get() || derive_scheduler_id(*value) == id.scheduler_id()
        }
        LegacyId::Text(text) => {
            if text == &id.to_string() {
                return true;
            }
            match text.trim().parse::<i64>() {
                Ok(value) => derive_scheduler_id(value) == id.scheduler_id(),
                Err(_) => false,
            }
        }
    }
}

/// An id as found in mirror data: a JSON number or a JSON string.
///
/// Always written back as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LegacyId {
    Int(i64),
    Text(String),
}

impl LegacyId {
    /// Canonical logical id, if the stored form is numeric.
    pub fn canonical(&self) -> Option<ReminderId> {
        match self {
            Self::Int(value) => Some(ReminderId::new(*value)),
            Self::Text(text) => text.parse().ok(),
        }
    }
}

impl From<ReminderId> for LegacyId {
    fn from(id: ReminderId) -> Self {
        Self::Text(id.to_string())
    }
}

impl fmt::Display for LegacyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl Serialize for LegacyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LegacyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(value) => Self::Int(value),
            Raw::Text(text) => Self::Text(text),
        })
    }
}
