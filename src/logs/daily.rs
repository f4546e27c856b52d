use anyhow::{bail, Result};
use chrono::NaiveDate;
use log::info;

use crate::{
    auth::UserContext,
    db::{
        models::{DailyLog, SessionProgress},
        Database,
    },
};

/// Daily logs are created lazily and their completed set only ever grows.
#[derive(Clone)]
pub struct DailyLogService {
    db: Database,
}

impl DailyLogService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, ctx: &UserContext, date: NaiveDate) -> Result<Option<DailyLog>> {
        self.db.get_daily_log(&ctx.user_id, date).await
    }

    pub async fn get_or_create(&self, ctx: &UserContext, date: NaiveDate) -> Result<DailyLog> {
        self.db.get_or_create_daily_log(&ctx.user_id, date).await
    }

    /// Add `exercise_name` to the day's completed set. Already-completed names are left alone.
    pub async fn mark_exercise_completed(
        &self,
        ctx: &UserContext,
        date: NaiveDate,
        exercise_name: &str,
        total_exercises: usize,
    ) -> Result<DailyLog> {
        let name = exercise_name.trim();
        if name.is_empty() {
            bail!("exercise name is required");
        }

        let log = self
            .db
            .add_completed_exercise(&ctx.user_id, date, name, total_exercises)
            .await?;
        if log.workout_completed {
            info!("{} finished every exercise on {date}", ctx.user_id);
        }
        Ok(log)
    }

    pub async fn set_workout_completed(
        &self,
        ctx: &UserContext,
        date: NaiveDate,
        completed: bool,
    ) -> Result<DailyLog> {
        self.db
            .set_workout_completed(&ctx.user_id, date, completed)
            .await
    }

    pub async fn set_notes(
        &self,
        ctx: &UserContext,
        date: NaiveDate,
        notes: &str,
    ) -> Result<DailyLog> {
        self.db
            .set_daily_notes(&ctx.user_id, date, notes.trim().to_string())
            .await
    }

    /// Merge a session snapshot into the day's log. `false` means it added nothing.
    pub async fn save_session_progress(
        &self,
        ctx: &UserContext,
        progress: SessionProgress,
    ) -> Result<bool> {
        if progress.owner_id != ctx.user_id {
            bail!("session progress for {} submitted by {}", progress.owner_id, ctx.user_id);
        }
        self.db.apply_session_progress(progress).await
    }

    /// Logs in `[from, to]` ordered by date.
    pub async fn logs_between(
        &self,
        ctx: &UserContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyLog>> {
        if to < from {
            return Ok(Vec::new());
        }
        self.db.list_daily_logs(&ctx.user_id, from, to).await
    }
}
