use anyhow::{bail, Result};
use chrono::Utc;
use log::info;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_datetime, parse_optional_date},
    models::{PlanDraft, WorkoutPlan},
};

const PLAN_COLUMNS: &str =
    "id, owner_id, name, start_date, end_date, is_active, created_at, updated_at";

fn row_to_plan(row: &Row) -> Result<WorkoutPlan> {
    let start_date: Option<String> = row.get("start_date")?;
    let end_date: Option<String> = row.get("end_date")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(WorkoutPlan {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        start_date: parse_optional_date(start_date, "start_date")?,
        end_date: parse_optional_date(end_date, "end_date")?,
        is_active: row.get("is_active")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

pub(crate) fn select_plan(conn: &Connection, plan_id: &str) -> Result<Option<WorkoutPlan>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAN_COLUMNS} FROM workout_plans WHERE id = ?1"
    ))?;
    let mut rows = stmt.query(params![plan_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_plan(row)?)),
        None => Ok(None),
    }
}

pub(crate) fn insert_plan_row(
    conn: &Connection,
    owner_id: &str,
    draft: &PlanDraft,
) -> Result<WorkoutPlan> {
    let now = Utc::now();
    let plan = WorkoutPlan {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        name: draft.name.trim().to_string(),
        start_date: draft.start_date,
        end_date: draft.end_date,
        is_active: false,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO workout_plans (id, owner_id, name, start_date, end_date, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
        params![
            plan.id,
            plan.owner_id,
            plan.name,
            plan.start_date.map(format_date),
            plan.end_date.map(format_date),
            plan.created_at.to_rfc3339(),
            plan.updated_at.to_rfc3339(),
        ],
    )?;

    Ok(plan)
}

impl Database {
    pub async fn insert_plan(&self, owner_id: &str, draft: PlanDraft) -> Result<WorkoutPlan> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| insert_plan_row(conn, &owner_id, &draft))
            .await
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<WorkoutPlan>> {
        let plan_id = plan_id.to_string();
        self.execute(move |conn| select_plan(conn, &plan_id)).await
    }

    /// Plans for an owner, newest first.
    pub async fn list_plans(&self, owner_id: &str) -> Result<Vec<WorkoutPlan>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAN_COLUMNS} FROM workout_plans
                 WHERE owner_id = ?1
                 ORDER BY created_at DESC"
            ))?;
            let mut rows = stmt.query(params![owner_id])?;
            let mut plans = Vec::new();
            while let Some(row) = rows.next()? {
                plans.push(row_to_plan(row)?);
            }
            Ok(plans)
        })
        .await
    }

    pub async fn get_active_plan(&self, owner_id: &str) -> Result<Option<WorkoutPlan>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAN_COLUMNS} FROM workout_plans
                 WHERE owner_id = ?1 AND is_active = 1
                 ORDER BY updated_at DESC
                 LIMIT 1"
            ))?;
            let mut rows = stmt.query(params![owner_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_plan(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn update_plan(&self, plan_id: &str, draft: PlanDraft) -> Result<WorkoutPlan> {
        let plan_id = plan_id.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE workout_plans
                 SET name = ?1, start_date = ?2, end_date = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    draft.name.trim(),
                    draft.start_date.map(format_date),
                    draft.end_date.map(format_date),
                    Utc::now().to_rfc3339(),
                    plan_id,
                ],
            )?;
            if updated == 0 {
                bail!("plan {plan_id} not found");
            }
            match select_plan(conn, &plan_id)? {
                Some(plan) => Ok(plan),
                None => bail!("plan {plan_id} vanished after update"),
            }
        })
        .await
    }

    pub async fn delete_plan(&self, plan_id: &str) -> Result<()> {
        let plan_id = plan_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM workout_plans WHERE id = ?1", params![plan_id])?;
            Ok(())
        })
        .await
    }

    /// Deactivate every plan of `owner_id`, then activate `plan_id`, in one transaction.
    pub async fn activate_plan(&self, owner_id: &str, plan_id: &str) -> Result<WorkoutPlan> {
        let owner_id = owner_id.to_string();
        let plan_id = plan_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn.transaction()?;

            tx.execute(
                "UPDATE workout_plans SET is_active = 0, updated_at = ?1
                 WHERE owner_id = ?2 AND is_active = 1",
                params![now, owner_id],
            )?;
            let activated = tx.execute(
                "UPDATE workout_plans SET is_active = 1, updated_at = ?1
                 WHERE id = ?2 AND owner_id = ?3",
                params![now, plan_id, owner_id],
            )?;
            if activated == 0 {
                // Dropping the transaction rolls back the deactivation.
                bail!("plan {plan_id} not found for owner {owner_id}");
            }
            tx.commit()?;

            info!("Activated plan {plan_id} for {owner_id}");
            match select_plan(conn, &plan_id)? {
                Some(plan) => Ok(plan),
                None => bail!("plan {plan_id} vanished after activation"),
            }
        })
        .await
    }
}
