use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Exercise;

/// Template schedule any user can copy into their own plans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPlan {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub author_id: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishedWorkoutDay {
    pub id: String,
    pub published_plan_id: String,
    pub day_of_week: u8,
    pub is_rest_day: bool,
    pub workout_name: String,
    pub exercises: Vec<Exercise>,
}
