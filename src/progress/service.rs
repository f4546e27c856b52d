use anyhow::Result;

use crate::{auth::UserContext, db::Database};

use super::{aggregate, CalendarCell, ProgressSummary, ProgressWindow};

#[derive(Clone)]
pub struct ProgressService {
    db: Database,
}

impl ProgressService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn summary(&self, ctx: &UserContext, window: ProgressWindow) -> Result<ProgressSummary> {
        let (from, to) = window.range();
        let logs = self.db.list_daily_logs(&ctx.user_id, from, to).await?;
        let weights = self.db.list_weight_logs(&ctx.user_id, from, to).await?;
        Ok(aggregate::summarize(window, &logs, &weights))
    }

    pub async fn calendar(&self, ctx: &UserContext, window: ProgressWindow) -> Result<Vec<CalendarCell>> {
        let (from, to) = window.range();
        let logs = self.db.list_daily_logs(&ctx.user_id, from, to).await?;
        let weights = self.db.list_weight_logs(&ctx.user_id, from, to).await?;
        Ok(aggregate::calendar(&window, &logs, &weights))
    }
}
