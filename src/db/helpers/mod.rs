use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::db::models::{Role, WeightUnit};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>> {
    match value {
        Some(raw) => parse_date(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_role(value: &str) -> Result<Role> {
    match value {
        "admin" => Ok(Role::Admin),
        "standard" => Ok(Role::Standard),
        other => Err(anyhow!("unknown role {other}")),
    }
}

pub fn parse_unit(value: &str) -> Result<WeightUnit> {
    match value {
        "kg" => Ok(WeightUnit::Kg),
        "lbs" => Ok(WeightUnit::Lbs),
        other => Err(anyhow!("unknown weight unit {other}")),
    }
}

/// JSON-encoded columns (exercise lists, completed-name sets).
pub fn encode_json<T: Serialize>(value: &T, field: &str) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to encode {field}"))
}

pub fn decode_json<T: DeserializeOwned>(raw: &str, field: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("failed to decode {field}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_use_iso_calendar_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(format_date(date), "2024-03-09");
        assert_eq!(parse_date("2024-03-09", "log_date").unwrap(), date);
        assert!(parse_date("09/03/2024", "log_date").is_err());
    }

    #[test]
    fn negative_values_are_rejected() {
        assert!(to_u64(-1, "revision").is_err());
        assert_eq!(to_u64(7, "revision").unwrap(), 7);
    }
}
