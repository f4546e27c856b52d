use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-day training record. Completed exercises are tracked by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub id: String,
    pub owner_id: String,
    pub log_date: NaiveDate,
    pub workout_completed: bool,
    pub completed_exercises: BTreeSet<String>,
    pub notes: String,
    /// Bumped by every write that changes the completed set.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full-set snapshot written by a running session.
///
/// The store merges it into whatever is already recorded; names are never removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub owner_id: String,
    pub log_date: NaiveDate,
    pub completed_exercises: BTreeSet<String>,
    /// Every exercise of the day being run; the workout is complete once all are recorded.
    pub planned_exercises: BTreeSet<String>,
    /// Position of this write within its session, for ordering in logs.
    pub sequence: u64,
}
