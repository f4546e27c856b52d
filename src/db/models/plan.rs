//! Workout plan and weekly schedule models.
//!
//! A plan owns up to seven `WorkoutDay` rows, one per `day_of_week`
//! (0 = Sunday .. 6 = Saturday, matching `chrono::Weekday::num_days_from_sunday`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Exercise;

pub const DAYS_PER_WEEK: u8 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDay {
    /// `None` for slots that have never been saved.
    pub id: Option<String>,
    pub plan_id: String,
    pub day_of_week: u8,
    pub is_rest_day: bool,
    pub workout_name: String,
    pub exercises: Vec<Exercise>,
}

impl WorkoutDay {
    pub fn rest(plan_id: impl Into<String>, day_of_week: u8) -> Self {
        Self {
            id: None,
            plan_id: plan_id.into(),
            day_of_week,
            is_rest_day: true,
            workout_name: String::new(),
            exercises: Vec::new(),
        }
    }
}

/// Fields accepted when creating or editing a plan.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDraft {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}
