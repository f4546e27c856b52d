use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, parse_datetime},
    models::ProgressPhoto,
};

fn row_to_photo(row: &Row) -> Result<ProgressPhoto> {
    let taken_on: String = row.get("taken_on")?;
    let created_at: String = row.get("created_at")?;

    Ok(ProgressPhoto {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        taken_on: parse_date(&taken_on, "taken_on")?,
        storage_path: row.get("storage_path")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_photo(&self, photo: &ProgressPhoto) -> Result<()> {
        let record = photo.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO progress_photos (id, owner_id, taken_on, storage_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.owner_id,
                    format_date(record.taken_on),
                    record.storage_path,
                    record.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Photos of an owner, most recent first.
    pub async fn list_photos(&self, owner_id: &str) -> Result<Vec<ProgressPhoto>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, taken_on, storage_path, created_at
                 FROM progress_photos
                 WHERE owner_id = ?1
                 ORDER BY taken_on DESC, created_at DESC",
            )?;
            let mut rows = stmt.query(params![owner_id])?;
            let mut photos = Vec::new();
            while let Some(row) = rows.next()? {
                photos.push(row_to_photo(row)?);
            }
            Ok(photos)
        })
        .await
    }

    pub async fn get_photo(&self, photo_id: &str) -> Result<Option<ProgressPhoto>> {
        let photo_id = photo_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, taken_on, storage_path, created_at
                 FROM progress_photos WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![photo_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_photo(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn delete_photo(&self, photo_id: &str) -> Result<()> {
        let photo_id = photo_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM progress_photos WHERE id = ?1", params![photo_id])?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn photo(id: &str, owner: &str, day: u32) -> ProgressPhoto {
        ProgressPhoto {
            id: id.into(),
            owner_id: owner.into(),
            taken_on: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            storage_path: format!("{owner}/{id}.jpg"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn photos_are_listed_newest_first_per_owner() {
        let db = Database::open_in_memory().unwrap();
        db.insert_photo(&photo("a", "u1", 1)).await.unwrap();
        db.insert_photo(&photo("b", "u1", 9)).await.unwrap();
        db.insert_photo(&photo("c", "u2", 5)).await.unwrap();

        let mine = db.list_photos("u1").await.unwrap();
        let ids: Vec<_> = mine.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);

        db.delete_photo("b").await.unwrap();
        assert!(db.get_photo("b").await.unwrap().is_none());
        assert_eq!(db.get_photo("a").await.unwrap().unwrap().owner_id, "u1");
    }
}
