use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{ExerciseLibraryItem, LibraryItemDraft},
};

fn row_to_item(row: &Row) -> Result<ExerciseLibraryItem> {
    let created_at: String = row.get("created_at")?;

    Ok(ExerciseLibraryItem {
        id: row.get("id")?,
        name: row.get("name")?,
        muscle_group: row.get("muscle_group")?,
        equipment: row.get("equipment")?,
        description: row.get("description")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn select_item(conn: &Connection, item_id: &str) -> Result<Option<ExerciseLibraryItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, muscle_group, equipment, description, created_at
         FROM exercise_library WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![item_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_item(row)?)),
        None => Ok(None),
    }
}

impl Database {
    pub async fn insert_library_item(&self, draft: LibraryItemDraft) -> Result<ExerciseLibraryItem> {
        if draft.name.trim().is_empty() {
            bail!("exercise name is required");
        }

        self.execute(move |conn| {
            let item = ExerciseLibraryItem {
                id: Uuid::new_v4().to_string(),
                name: draft.name.trim().to_string(),
                muscle_group: draft.muscle_group,
                equipment: draft.equipment,
                description: draft.description,
                created_at: Utc::now(),
            };

            conn.execute(
                "INSERT INTO exercise_library (id, name, muscle_group, equipment, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    item.id,
                    item.name,
                    item.muscle_group,
                    item.equipment,
                    item.description,
                    item.created_at.to_rfc3339(),
                ],
            )?;
            Ok(item)
        })
        .await
    }

    pub async fn get_library_item(&self, item_id: &str) -> Result<Option<ExerciseLibraryItem>> {
        let item_id = item_id.to_string();
        self.execute(move |conn| select_item(conn, &item_id)).await
    }

    /// Library entries ordered by name; `search` matches name or muscle group, case-insensitively.
    pub async fn list_library_items(&self, search: Option<String>) -> Result<Vec<ExerciseLibraryItem>> {
        self.execute(move |conn| {
            let pattern = format!("%{}%", search.unwrap_or_default().trim().to_lowercase());
            let mut stmt = conn.prepare(
                "SELECT id, name, muscle_group, equipment, description, created_at
                 FROM exercise_library
                 WHERE lower(name) LIKE ?1 OR lower(coalesce(muscle_group, '')) LIKE ?1
                 ORDER BY name ASC",
            )?;
            let mut rows = stmt.query(params![pattern])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(row_to_item(row)?);
            }
            Ok(items)
        })
        .await
    }

    pub async fn update_library_item(
        &self,
        item_id: &str,
        draft: LibraryItemDraft,
    ) -> Result<ExerciseLibraryItem> {
        let item_id = item_id.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE exercise_library
                 SET name = ?1, muscle_group = ?2, equipment = ?3, description = ?4
                 WHERE id = ?5",
                params![
                    draft.name.trim(),
                    draft.muscle_group,
                    draft.equipment,
                    draft.description,
                    item_id,
                ],
            )?;
            if updated == 0 {
                bail!("library item {item_id} not found");
            }
            match select_item(conn, &item_id)? {
                Some(item) => Ok(item),
                None => bail!("library item {item_id} vanished after update"),
            }
        })
        .await
    }

    pub async fn delete_library_item(&self, item_id: &str) -> Result<()> {
        let item_id = item_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM exercise_library WHERE id = ?1", params![item_id])?;
            Ok(())
        })
        .await
    }
}
