use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use log::debug;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{decode_json, encode_json, format_date, parse_date, parse_datetime, to_i64, to_u64},
    models::{DailyLog, SessionProgress},
};

const LOG_COLUMNS: &str = "id, owner_id, log_date, workout_completed, completed_exercises, notes, revision, created_at, updated_at";

fn row_to_daily_log(row: &Row) -> Result<DailyLog> {
    let log_date: String = row.get("log_date")?;
    let completed: String = row.get("completed_exercises")?;
    let revision: i64 = row.get("revision")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(DailyLog {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        log_date: parse_date(&log_date, "log_date")?,
        workout_completed: row.get("workout_completed")?,
        completed_exercises: decode_json(&completed, "completed_exercises")?,
        notes: row.get("notes")?,
        revision: to_u64(revision, "revision")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn select_log(conn: &Connection, owner_id: &str, date: NaiveDate) -> Result<Option<DailyLog>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LOG_COLUMNS} FROM daily_logs WHERE owner_id = ?1 AND log_date = ?2"
    ))?;
    let mut rows = stmt.query(params![owner_id, format_date(date)])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_daily_log(row)?)),
        None => Ok(None),
    }
}

/// Lazily create the row for `(owner_id, date)` and return it.
fn ensure_log(conn: &Connection, owner_id: &str, date: NaiveDate) -> Result<DailyLog> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR IGNORE INTO daily_logs (id, owner_id, log_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![Uuid::new_v4().to_string(), owner_id, format_date(date), now],
    )?;

    match select_log(conn, owner_id, date)? {
        Some(log) => Ok(log),
        None => bail!("daily log for {owner_id} on {date} missing after insert"),
    }
}

impl Database {
    pub async fn get_daily_log(&self, owner_id: &str, date: NaiveDate) -> Result<Option<DailyLog>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| select_log(conn, &owner_id, date))
            .await
    }

    pub async fn get_or_create_daily_log(&self, owner_id: &str, date: NaiveDate) -> Result<DailyLog> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| ensure_log(conn, &owner_id, date))
            .await
    }

    /// Logs in `[from, to]`, ordered by date ascending.
    pub async fn list_daily_logs(
        &self,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyLog>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LOG_COLUMNS} FROM daily_logs
                 WHERE owner_id = ?1 AND log_date BETWEEN ?2 AND ?3
                 ORDER BY log_date ASC"
            ))?;
            let mut rows = stmt.query(params![owner_id, format_date(from), format_date(to)])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row_to_daily_log(row)?);
            }
            Ok(logs)
        })
        .await
    }

    /// Append one exercise name to the day's completed set. Names already present are kept as-is.
    pub async fn add_completed_exercise(
        &self,
        owner_id: &str,
        date: NaiveDate,
        exercise_name: &str,
        total_exercises: usize,
    ) -> Result<DailyLog> {
        let owner_id = owner_id.to_string();
        let exercise_name = exercise_name.to_string();
        self.execute(move |conn| {
            let mut log = ensure_log(conn, &owner_id, date)?;
            if !log.completed_exercises.insert(exercise_name) {
                return Ok(log);
            }
            log.workout_completed |=
                total_exercises > 0 && log.completed_exercises.len() >= total_exercises;
            log.revision += 1;

            conn.execute(
                "UPDATE daily_logs
                 SET completed_exercises = ?1, workout_completed = ?2, revision = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    encode_json(&log.completed_exercises, "completed_exercises")?,
                    log.workout_completed,
                    to_i64(log.revision)?,
                    Utc::now().to_rfc3339(),
                    log.id,
                ],
            )?;
            Ok(log)
        })
        .await
    }

    pub async fn set_workout_completed(
        &self,
        owner_id: &str,
        date: NaiveDate,
        completed: bool,
    ) -> Result<DailyLog> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut log = ensure_log(conn, &owner_id, date)?;
            conn.execute(
                "UPDATE daily_logs SET workout_completed = ?1, updated_at = ?2 WHERE id = ?3",
                params![completed, Utc::now().to_rfc3339(), log.id],
            )?;
            log.workout_completed = completed;
            Ok(log)
        })
        .await
    }

    pub async fn set_daily_notes(&self, owner_id: &str, date: NaiveDate, notes: String) -> Result<DailyLog> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut log = ensure_log(conn, &owner_id, date)?;
            conn.execute(
                "UPDATE daily_logs SET notes = ?1, updated_at = ?2 WHERE id = ?3",
                params![notes, Utc::now().to_rfc3339(), log.id],
            )?;
            log.notes = notes;
            Ok(log)
        })
        .await
    }

    /// Merge a session's completed-set snapshot into the stored log.
    ///
    /// The stored set only grows: names recorded elsewhere are kept, and the
    /// workout counts as completed once every planned exercise is present.
    /// Returns `false` when the snapshot added nothing.
    pub async fn apply_session_progress(&self, progress: SessionProgress) -> Result<bool> {
        self.execute(move |conn| {
            let mut log = ensure_log(conn, &progress.owner_id, progress.log_date)?;
            let before = log.completed_exercises.len();
            log.completed_exercises
                .extend(progress.completed_exercises.iter().cloned());

            let all_planned_done = !progress.planned_exercises.is_empty()
                && progress
                    .planned_exercises
                    .is_subset(&log.completed_exercises);
            let grew = log.completed_exercises.len() > before;
            let finished_now = all_planned_done && !log.workout_completed;

            if !grew && !finished_now {
                debug!(
                    "Session write #{} for {} on {} changed nothing",
                    progress.sequence, progress.owner_id, progress.log_date
                );
                return Ok(false);
            }

            log.workout_completed |= all_planned_done;
            log.revision += 1;
            conn.execute(
                "UPDATE daily_logs
                 SET completed_exercises = ?1, workout_completed = ?2, revision = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    encode_json(&log.completed_exercises, "completed_exercises")?,
                    log.workout_completed,
                    to_i64(log.revision)?,
                    Utc::now().to_rfc3339(),
                    log.id,
                ],
            )?;
            Ok(true)
        })
        .await
    }
}
