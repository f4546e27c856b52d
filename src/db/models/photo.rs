use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPhoto {
    pub id: String,
    pub owner_id: String,
    pub taken_on: NaiveDate,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}
