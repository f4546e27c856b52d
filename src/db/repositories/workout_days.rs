use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{decode_json, encode_json},
    models::{WorkoutDay, DAYS_PER_WEEK},
};

fn row_to_day(row: &Row) -> Result<WorkoutDay> {
    let exercises: String = row.get("exercises")?;

    Ok(WorkoutDay {
        id: Some(row.get("id")?),
        plan_id: row.get("plan_id")?,
        day_of_week: row.get("day_of_week")?,
        is_rest_day: row.get("is_rest_day")?,
        workout_name: row.get("workout_name")?,
        exercises: decode_json(&exercises, "exercises")?,
    })
}

/// Insert or replace the slot for `(plan_id, day_of_week)`; the stored id survives updates.
pub(crate) fn upsert_day_row(conn: &Connection, day: &WorkoutDay) -> Result<WorkoutDay> {
    if day.day_of_week >= DAYS_PER_WEEK {
        bail!("day_of_week {} out of range", day.day_of_week);
    }

    let exercises = encode_json(&day.exercises, "exercises")?;
    let new_id = Uuid::new_v4().to_string();

    conn.execute(
        "INSERT INTO workout_days (id, plan_id, day_of_week, is_rest_day, workout_name, exercises, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(plan_id, day_of_week) DO UPDATE SET
            is_rest_day = excluded.is_rest_day,
            workout_name = excluded.workout_name,
            exercises = excluded.exercises,
            updated_at = excluded.updated_at",
        params![
            new_id,
            day.plan_id,
            day.day_of_week,
            day.is_rest_day,
            day.workout_name,
            exercises,
            Utc::now().to_rfc3339(),
        ],
    )?;

    match select_day(conn, &day.plan_id, day.day_of_week)? {
        Some(saved) => Ok(saved),
        None => bail!(
            "workout day {}/{} missing after upsert",
            day.plan_id,
            day.day_of_week
        ),
    }
}

fn select_day(conn: &Connection, plan_id: &str, day_of_week: u8) -> Result<Option<WorkoutDay>> {
    let mut stmt = conn.prepare(
        "SELECT id, plan_id, day_of_week, is_rest_day, workout_name, exercises
         FROM workout_days
         WHERE plan_id = ?1 AND day_of_week = ?2",
    )?;
    let mut rows = stmt.query(params![plan_id, day_of_week])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_day(row)?)),
        None => Ok(None),
    }
}

impl Database {
    pub async fn upsert_workout_day(&self, day: WorkoutDay) -> Result<WorkoutDay> {
        self.execute(move |conn| upsert_day_row(conn, &day)).await
    }

    pub async fn get_workout_day(
        &self,
        plan_id: &str,
        day_of_week: u8,
    ) -> Result<Option<WorkoutDay>> {
        let plan_id = plan_id.to_string();
        self.execute(move |conn| select_day(conn, &plan_id, day_of_week))
            .await
    }

    /// Stored slots of a plan ordered by weekday. Slots never saved are absent.
    pub async fn list_workout_days(&self, plan_id: &str) -> Result<Vec<WorkoutDay>> {
        let plan_id = plan_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, plan_id, day_of_week, is_rest_day, workout_name, exercises
                 FROM workout_days
                 WHERE plan_id = ?1
                 ORDER BY day_of_week ASC",
            )?;
            let mut rows = stmt.query(params![plan_id])?;
            let mut days = Vec::new();
            while let Some(row) = rows.next()? {
                days.push(row_to_day(row)?);
            }
            Ok(days)
        })
        .await
    }
}
