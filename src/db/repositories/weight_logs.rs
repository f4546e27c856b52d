use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, parse_datetime, parse_unit},
    models::{WeightLog, WeightUnit},
};

const WEIGHT_COLUMNS: &str = "id, owner_id, log_date, weight, unit, created_at, updated_at";

fn row_to_weight_log(row: &Row) -> Result<WeightLog> {
    let log_date: String = row.get("log_date")?;
    let unit: String = row.get("unit")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(WeightLog {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        log_date: parse_date(&log_date, "log_date")?,
        weight: row.get("weight")?,
        unit: parse_unit(&unit)?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn collect_weights(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<WeightLog>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(args)?;
    let mut logs = Vec::new();
    while let Some(row) = rows.next()? {
        logs.push(row_to_weight_log(row)?);
    }
    Ok(logs)
}

impl Database {
    /// At most one entry per owner and date: a second save updates the first.
    pub async fn upsert_weight_log(
        &self,
        owner_id: &str,
        date: NaiveDate,
        weight: f64,
        unit: WeightUnit,
    ) -> Result<WeightLog> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO weight_logs (id, owner_id, log_date, weight, unit, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(owner_id, log_date) DO UPDATE SET
                    weight = excluded.weight,
                    unit = excluded.unit,
                    updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    owner_id,
                    format_date(date),
                    weight,
                    unit.as_str(),
                    now,
                ],
            )?;

            let logs = collect_weights(
                conn,
                &format!(
                    "SELECT {WEIGHT_COLUMNS} FROM weight_logs WHERE owner_id = ?1 AND log_date = ?2"
                ),
                params![owner_id, format_date(date)],
            )?;
            match logs.into_iter().next() {
                Some(log) => Ok(log),
                None => bail!("weight log for {owner_id} on {date} missing after upsert"),
            }
        })
        .await
    }

    /// Entries in `[from, to]`, ordered by date ascending.
    pub async fn list_weight_logs(
        &self,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WeightLog>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            collect_weights(
                conn,
                &format!(
                    "SELECT {WEIGHT_COLUMNS} FROM weight_logs
                     WHERE owner_id = ?1 AND log_date BETWEEN ?2 AND ?3
                     ORDER BY log_date ASC"
                ),
                params![owner_id, format_date(from), format_date(to)],
            )
        })
        .await
    }

    pub async fn latest_weight_log(&self, owner_id: &str) -> Result<Option<WeightLog>> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            let logs = collect_weights(
                conn,
                &format!(
                    "SELECT {WEIGHT_COLUMNS} FROM weight_logs
                     WHERE owner_id = ?1
                     ORDER BY log_date DESC
                     LIMIT 1"
                ),
                params![owner_id],
            )?;
            Ok(logs.into_iter().next())
        })
        .await
    }

    pub async fn delete_weight_log(&self, owner_id: &str, date: NaiveDate) -> Result<()> {
        let owner_id = owner_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM weight_logs WHERE owner_id = ?1 AND log_date = ?2",
                params![owner_id, format_date(date)],
            )?;
            Ok(())
        })
        .await
    }
}
