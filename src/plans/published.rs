use anyhow::{bail, Context, Result};
use log::info;

use crate::{
    auth::UserContext,
    db::{
        models::{PublishedPlan, PublishedWorkoutDay, WorkoutPlan},
        Database,
    },
};

/// Template plans. Admins publish from their own plans; every user may copy.
#[derive(Clone)]
pub struct PublishedPlans {
    db: Database,
}

impl PublishedPlans {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<PublishedPlan>> {
        self.db.list_published_plans().await
    }

    pub async fn days(&self, published_plan_id: &str) -> Result<Vec<PublishedWorkoutDay>> {
        self.db.list_published_days(published_plan_id).await
    }

    /// Snapshot one of the caller's plans, with its saved days, as a template.
    pub async fn publish(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        description: Option<String>,
    ) -> Result<PublishedPlan> {
        ctx.require_admin()?;
        let plan = self
            .db
            .get_plan(plan_id)
            .await?
            .with_context(|| format!("plan {plan_id} not found"))?;
        if plan.owner_id != ctx.user_id {
            bail!("plan {plan_id} does not belong to {}", ctx.user_id);
        }

        let days = self.db.list_workout_days(plan_id).await?;
        let description = description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        let published = self
            .db
            .insert_published_plan(&ctx.user_id, plan.name, description, days)
            .await?;

        info!("Published plan {plan_id} as {}", published.id);
        Ok(published)
    }

    pub async fn delete(&self, ctx: &UserContext, published_plan_id: &str) -> Result<()> {
        ctx.require_admin()?;
        self.db.delete_published_plan(published_plan_id).await
    }

    /// Copy a template into the caller's plans. The copy starts inactive.
    pub async fn copy_to_my_plans(
        &self,
        ctx: &UserContext,
        published_plan_id: &str,
    ) -> Result<WorkoutPlan> {
        self.db
            .copy_published_plan(published_plan_id, &ctx.user_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::models::{Exercise, PlanDraft, Role},
        plans::PlanEditor,
    };

    fn ctx(id: &str, role: Role) -> UserContext {
        UserContext {
            user_id: id.into(),
            email: format!("{id}@example.com"),
            role,
        }
    }

    async fn admin_plan(db: &Database, admin: &UserContext) -> WorkoutPlan {
        let editor = PlanEditor::new(db.clone());
        let plan = editor
            .create_plan(
                admin,
                PlanDraft {
                    name: "Starter".into(),
                    ..PlanDraft::default()
                },
            )
            .await
            .unwrap();
        editor
            .set_workout_day(admin, &plan.id, 1, "Full Body", vec![Exercise::new("Squat", 3, 5)])
            .await
            .unwrap();
        editor.set_rest_day(admin, &plan.id, 0).await.unwrap();
        plan
    }

    #[tokio::test]
    async fn publish_and_copy() {
        let db = Database::open_in_memory().unwrap();
        let admin = ctx("admin", Role::Admin);
        let plan = admin_plan(&db, &admin).await;
        let published = PublishedPlans::new(db.clone());

        let template = published
            .publish(&admin, &plan.id, Some("  Three days a week ".into()))
            .await
            .unwrap();
        assert_eq!(template.description.as_deref(), Some("Three days a week"));
        assert_eq!(published.days(&template.id).await.unwrap().len(), 2);

        let member = ctx("member", Role::Standard);
        let copy = published.copy_to_my_plans(&member, &template.id).await.unwrap();
        assert_eq!(copy.owner_id, "member");
        assert!(!copy.is_active);

        let week = PlanEditor::new(db).week_schedule(&member, &copy.id).await.unwrap();
        assert_eq!(week[1].workout_name, "Full Body");
        assert_eq!(week[1].exercises.len(), 1);
    }

    #[tokio::test]
    async fn only_admins_publish_or_delete() {
        let db = Database::open_in_memory().unwrap();
        let admin = ctx("admin", Role::Admin);
        let plan = admin_plan(&db, &admin).await;
        let published = PublishedPlans::new(db.clone());

        let standard = ctx("admin", Role::Standard);
        assert!(published.publish(&standard, &plan.id, None).await.is_err());

        let template = published.publish(&admin, &plan.id, None).await.unwrap();
        assert!(published.delete(&standard, &template.id).await.is_err());
        assert_eq!(published.list().await.unwrap().len(), 1);

        published.delete(&admin, &template.id).await.unwrap();
        assert!(published.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admins_publish_only_their_own_plans() {
        let db = Database::open_in_memory().unwrap();
        let owner = ctx("owner", Role::Admin);
        let plan = admin_plan(&db, &owner).await;

        let other_admin = ctx("other", Role::Admin);
        assert!(PublishedPlans::new(db)
            .publish(&other_admin, &plan.id, None)
            .await
            .is_err());
    }
}
