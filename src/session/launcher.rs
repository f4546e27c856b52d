use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::NaiveDate;
use log::{debug, info};

use crate::{
    auth::UserContext, db::Database, notify::Notifier, plans::PlanEditor, settings::SettingsStore,
};

use super::controller::{SessionController, SessionParams};

/// Opens guided sessions for a date, seeded from the active plan and the day's log.
#[derive(Clone)]
pub struct SessionLauncher {
    db: Database,
    plans: PlanEditor,
    notifier: Notifier,
    settings: Arc<SettingsStore>,
    tick_interval: Duration,
}

impl SessionLauncher {
    pub fn new(
        db: Database,
        notifier: Notifier,
        settings: Arc<SettingsStore>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            plans: PlanEditor::new(db.clone()),
            db,
            notifier,
            settings,
            tick_interval,
        }
    }

    /// `None` when the date has no scheduled workout: no active plan, a rest day,
    /// or a day without exercises.
    pub async fn start_for_date(
        &self,
        ctx: &UserContext,
        date: NaiveDate,
    ) -> Result<Option<SessionController<Database>>> {
        let Some(day) = self.plans.workout_for_date(ctx, date).await? else {
            return Ok(None);
        };
        if day.is_rest_day || day.exercises.is_empty() {
            debug!("Nothing to run for {} on {date}", ctx.user_id);
            return Ok(None);
        }

        let log = self.db.get_or_create_daily_log(&ctx.user_id, date).await?;
        let settings = self.settings.get();

        let controller = SessionController::start(
            Arc::new(self.db.clone()),
            self.notifier.clone(),
            SessionParams {
                owner_id: ctx.user_id.clone(),
                log_date: date,
                exercises: day.exercises,
                previously_completed: log.completed_exercises,
                default_rest_secs: settings.default_rest_secs,
                tick_interval: self.tick_interval,
                close_delay: Duration::from_secs(settings.completion_close_delay_secs),
            },
        )?;

        info!("Started '{}' session for {} on {date}", day.workout_name, ctx.user_id);
        Ok(Some(controller))
    }
}
