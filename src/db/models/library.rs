use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalogue entry that plan exercises may reference through `library_ref`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLibraryItem {
    pub id: String,
    pub name: String,
    pub muscle_group: Option<String>,
    pub equipment: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItemDraft {
    pub name: String,
    pub muscle_group: Option<String>,
    pub equipment: Option<String>,
    pub description: Option<String>,
}
