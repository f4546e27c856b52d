use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use log::debug;

use crate::{
    auth::UserContext,
    db::{
        models::{WeightLog, WeightUnit},
        Database,
    },
    settings::SettingsStore,
};

/// Parse free-text weight input. Anything that is not a positive finite number is rejected.
pub fn parse_weight_input(raw: &str) -> Option<f64> {
    let weight: f64 = raw.trim().replace(',', ".").parse().ok()?;
    (weight.is_finite() && weight > 0.0).then_some(weight)
}

#[derive(Clone)]
pub struct WeightLogService {
    db: Database,
    settings: Arc<SettingsStore>,
}

impl WeightLogService {
    pub fn new(db: Database, settings: Arc<SettingsStore>) -> Self {
        Self { db, settings }
    }

    /// Save the weight for `date`, replacing any earlier entry for that day.
    ///
    /// Unparseable input is ignored and yields `Ok(None)`. Without an explicit
    /// unit the user's preferred unit is used.
    pub async fn log_weight(
        &self,
        ctx: &UserContext,
        date: NaiveDate,
        raw_input: &str,
        unit: Option<WeightUnit>,
    ) -> Result<Option<WeightLog>> {
        let Some(weight) = parse_weight_input(raw_input) else {
            debug!("Ignoring weight input {raw_input:?}");
            return Ok(None);
        };
        let unit = unit.unwrap_or_else(|| self.settings.get().weight_unit);

        let log = self
            .db
            .upsert_weight_log(&ctx.user_id, date, weight, unit)
            .await?;
        Ok(Some(log))
    }

    pub async fn weights_between(
        &self,
        ctx: &UserContext,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<WeightLog>> {
        if to < from {
            return Ok(Vec::new());
        }
        self.db.list_weight_logs(&ctx.user_id, from, to).await
    }

    pub async fn latest(&self, ctx: &UserContext) -> Result<Option<WeightLog>> {
        self.db.latest_weight_log(&ctx.user_id).await
    }

    pub async fn delete(&self, ctx: &UserContext, date: NaiveDate) -> Result<()> {
        self.db.delete_weight_log(&ctx.user_id, date).await
    }
}
