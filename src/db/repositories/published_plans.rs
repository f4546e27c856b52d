use anyhow::{bail, Result};
use chrono::Utc;
use log::info;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{decode_json, encode_json, parse_datetime},
    models::{PlanDraft, PublishedPlan, PublishedWorkoutDay, WorkoutDay, WorkoutPlan},
};

use super::{plans::insert_plan_row, workout_days::upsert_day_row};

fn row_to_published_plan(row: &Row) -> Result<PublishedPlan> {
    let published_at: String = row.get("published_at")?;

    Ok(PublishedPlan {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        author_id: row.get("author_id")?,
        published_at: parse_datetime(&published_at, "published_at")?,
    })
}

fn row_to_published_day(row: &Row) -> Result<PublishedWorkoutDay> {
    let exercises: String = row.get("exercises")?;

    Ok(PublishedWorkoutDay {
        id: row.get("id")?,
        published_plan_id: row.get("published_plan_id")?,
        day_of_week: row.get("day_of_week")?,
        is_rest_day: row.get("is_rest_day")?,
        workout_name: row.get("workout_name")?,
        exercises: decode_json(&exercises, "exercises")?,
    })
}

fn select_published_days(conn: &Connection, published_plan_id: &str) -> Result<Vec<PublishedWorkoutDay>> {
    let mut stmt = conn.prepare(
        "SELECT id, published_plan_id, day_of_week, is_rest_day, workout_name, exercises
         FROM published_workout_days
         WHERE published_plan_id = ?1
         ORDER BY day_of_week ASC",
    )?;
    let mut rows = stmt.query(params![published_plan_id])?;
    let mut days = Vec::new();
    while let Some(row) = rows.next()? {
        days.push(row_to_published_day(row)?);
    }
    Ok(days)
}

impl Database {
    /// Snapshot a schedule as a template. Plan and days are written in one transaction.
    pub async fn insert_published_plan(
        &self,
        author_id: &str,
        name: String,
        description: Option<String>,
        days: Vec<WorkoutDay>,
    ) -> Result<PublishedPlan> {
        let author_id = author_id.to_string();
        self.execute(move |conn| {
            let plan = PublishedPlan {
                id: Uuid::new_v4().to_string(),
                name,
                description,
                author_id,
                published_at: Utc::now(),
            };

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO published_plans (id, name, description, author_id, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    plan.id,
                    plan.name,
                    plan.description,
                    plan.author_id,
                    plan.published_at.to_rfc3339(),
                ],
            )?;
            for day in &days {
                tx.execute(
                    "INSERT INTO published_workout_days (id, published_plan_id, day_of_week, is_rest_day, workout_name, exercises)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        Uuid::new_v4().to_string(),
                        plan.id,
                        day.day_of_week,
                        day.is_rest_day,
                        day.workout_name,
                        encode_json(&day.exercises, "exercises")?,
                    ],
                )?;
            }
            tx.commit()?;

            Ok(plan)
        })
        .await
    }

    pub async fn list_published_plans(&self) -> Result<Vec<PublishedPlan>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, author_id, published_at
                 FROM published_plans
                 ORDER BY published_at DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut plans = Vec::new();
            while let Some(row) = rows.next()? {
                plans.push(row_to_published_plan(row)?);
            }
            Ok(plans)
        })
        .await
    }

    pub async fn list_published_days(&self, published_plan_id: &str) -> Result<Vec<PublishedWorkoutDay>> {
        let published_plan_id = published_plan_id.to_string();
        self.execute(move |conn| select_published_days(conn, &published_plan_id))
            .await
    }

    pub async fn delete_published_plan(&self, published_plan_id: &str) -> Result<()> {
        let published_plan_id = published_plan_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM published_plans WHERE id = ?1",
                params![published_plan_id],
            )?;
            Ok(())
        })
        .await
    }

    /// Copy a template into `owner_id`'s plans as an inactive plan with the same schedule.
    pub async fn copy_published_plan(
        &self,
        published_plan_id: &str,
        owner_id: &str,
    ) -> Result<WorkoutPlan> {
        let published_plan_id = published_plan_id.to_string();
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let name: Option<String> = {
                let mut stmt = conn.prepare("SELECT name FROM published_plans WHERE id = ?1")?;
                let mut rows = stmt.query(params![published_plan_id])?;
                match rows.next()? {
                    Some(row) => Some(row.get(0)?),
                    None => None,
                }
            };
            let Some(name) = name else {
                bail!("published plan {published_plan_id} not found");
            };
            let days = select_published_days(conn, &published_plan_id)?;

            let tx = conn.transaction()?;
            let plan = insert_plan_row(
                &tx,
                &owner_id,
                &PlanDraft {
                    name,
                    ..PlanDraft::default()
                },
            )?;
            for day in days {
                upsert_day_row(
                    &tx,
                    &WorkoutDay {
                        id: None,
                        plan_id: plan.id.clone(),
                        day_of_week: day.day_of_week,
                        is_rest_day: day.is_rest_day,
                        workout_name: day.workout_name,
                        exercises: day.exercises,
                    },
                )?;
            }
            tx.commit()?;

            info!("Copied published plan {published_plan_id} into {} for {owner_id}", plan.id);
            Ok(plan)
        })
        .await
    }
}
