use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_role},
    models::{Profile, Role},
};

fn row_to_profile(row: &Row) -> Result<Profile> {
    let role: String = row.get("role")?;
    let created_at: String = row.get("created_at")?;

    Ok(Profile {
        user_id: row.get("user_id")?,
        email: row.get("email")?,
        display_name: row.get("display_name")?,
        role: parse_role(&role)?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Create the profile row for a freshly signed-up identity. Existing rows are left untouched.
    pub async fn ensure_profile(&self, user_id: &str, email: &str) -> Result<Profile> {
        let user_id = user_id.to_string();
        let email = email.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO profiles (user_id, email, role, created_at)
                 VALUES (?1, ?2, 'standard', ?3)",
                params![user_id, email, Utc::now().to_rfc3339()],
            )?;

            let mut stmt = conn.prepare(
                "SELECT user_id, email, display_name, role, created_at
                 FROM profiles WHERE user_id = ?1",
            )?;
            let mut rows = stmt.query(params![user_id])?;
            match rows.next()? {
                Some(row) => row_to_profile(row),
                None => bail!("profile {user_id} missing after insert"),
            }
        })
        .await
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, email, display_name, role, created_at
                 FROM profiles WHERE user_id = ?1",
            )?;
            let mut rows = stmt.query(params![user_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_profile(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn set_profile_role(&self, user_id: &str, role: Role) -> Result<()> {
        if role == Role::Unresolved {
            bail!("cannot store an unresolved role");
        }
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE profiles SET role = ?1 WHERE user_id = ?2",
                params![role.as_str(), user_id],
            )?;
            if updated == 0 {
                bail!("profile {user_id} not found");
            }
            Ok(())
        })
        .await
    }

    pub async fn set_display_name(&self, user_id: &str, display_name: Option<String>) -> Result<()> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE profiles SET display_name = ?1 WHERE user_id = ?2",
                params![display_name, user_id],
            )?;
            Ok(())
        })
        .await
    }
}
