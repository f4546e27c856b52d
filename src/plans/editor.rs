use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use log::{debug, info};

use crate::{
    auth::UserContext,
    db::{
        models::{Exercise, PlanDraft, WorkoutDay, WorkoutPlan, DAYS_PER_WEEK},
        Database,
    },
};

/// Owner-scoped editing of plans and their seven day slots.
#[derive(Clone)]
pub struct PlanEditor {
    db: Database,
}

impl PlanEditor {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create_plan(&self, ctx: &UserContext, draft: PlanDraft) -> Result<WorkoutPlan> {
        validate_draft(&draft)?;
        let plan = self.db.insert_plan(&ctx.user_id, draft).await?;
        info!("Created plan {} for {}", plan.id, ctx.user_id);
        Ok(plan)
    }

    pub async fn list_plans(&self, ctx: &UserContext) -> Result<Vec<WorkoutPlan>> {
        self.db.list_plans(&ctx.user_id).await
    }

    pub async fn update_plan(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        draft: PlanDraft,
    ) -> Result<WorkoutPlan> {
        validate_draft(&draft)?;
        self.owned_plan(ctx, plan_id).await?;
        self.db.update_plan(plan_id, draft).await
    }

    pub async fn delete_plan(&self, ctx: &UserContext, plan_id: &str) -> Result<()> {
        self.owned_plan(ctx, plan_id).await?;
        self.db.delete_plan(plan_id).await?;
        info!("Deleted plan {plan_id}");
        Ok(())
    }

    /// Make `plan_id` the owner's only active plan.
    pub async fn activate_plan(&self, ctx: &UserContext, plan_id: &str) -> Result<WorkoutPlan> {
        self.owned_plan(ctx, plan_id).await?;
        self.db.activate_plan(&ctx.user_id, plan_id).await
    }

    pub async fn active_plan(&self, ctx: &UserContext) -> Result<Option<WorkoutPlan>> {
        self.db.get_active_plan(&ctx.user_id).await
    }

    /// All seven slots, Sunday first. Slots never saved come back as rest days.
    pub async fn week_schedule(&self, ctx: &UserContext, plan_id: &str) -> Result<Vec<WorkoutDay>> {
        self.owned_plan(ctx, plan_id).await?;
        let stored = self.db.list_workout_days(plan_id).await?;
        Ok(fill_week(plan_id, stored))
    }

    pub async fn set_rest_day(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        day_of_week: u8,
    ) -> Result<WorkoutDay> {
        check_weekday(day_of_week)?;
        self.owned_plan(ctx, plan_id).await?;
        self.db
            .upsert_workout_day(WorkoutDay::rest(plan_id, day_of_week))
            .await
    }

    pub async fn set_workout_day(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        day_of_week: u8,
        workout_name: &str,
        mut exercises: Vec<Exercise>,
    ) -> Result<WorkoutDay> {
        check_weekday(day_of_week)?;
        normalize_exercises(&mut exercises)?;
        self.owned_plan(ctx, plan_id).await?;

        self.db
            .upsert_workout_day(WorkoutDay {
                id: None,
                plan_id: plan_id.to_string(),
                day_of_week,
                is_rest_day: false,
                workout_name: workout_name.trim().to_string(),
                exercises,
            })
            .await
    }

    /// Append to the day's list. A rest day becomes a workout day.
    pub async fn add_exercise(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        day_of_week: u8,
        exercise: Exercise,
    ) -> Result<WorkoutDay> {
        self.edit_day(ctx, plan_id, day_of_week, move |day| {
            day.is_rest_day = false;
            day.exercises.push(exercise);
            Ok(())
        })
        .await
    }

    pub async fn update_exercise(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        day_of_week: u8,
        index: usize,
        exercise: Exercise,
    ) -> Result<WorkoutDay> {
        self.edit_day(ctx, plan_id, day_of_week, move |day| {
            let Some(slot) = day.exercises.get_mut(index) else {
                bail!("no exercise at position {index}");
            };
            *slot = exercise;
            Ok(())
        })
        .await
    }

    pub async fn remove_exercise(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        day_of_week: u8,
        index: usize,
    ) -> Result<WorkoutDay> {
        self.edit_day(ctx, plan_id, day_of_week, move |day| {
            if index >= day.exercises.len() {
                bail!("no exercise at position {index}");
            }
            day.exercises.remove(index);
            Ok(())
        })
        .await
    }

    pub async fn move_exercise(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        day_of_week: u8,
        from: usize,
        to: usize,
    ) -> Result<WorkoutDay> {
        self.edit_day(ctx, plan_id, day_of_week, move |day| {
            let len = day.exercises.len();
            if from >= len || to >= len {
                bail!("cannot move exercise {from} to {to} in a list of {len}");
            }
            let exercise = day.exercises.remove(from);
            day.exercises.insert(to, exercise);
            Ok(())
        })
        .await
    }

    /// The active plan's slot for `date`, or `None` when there is no active plan,
    /// the date is outside the plan's range, or the slot was never saved.
    pub async fn workout_for_date(
        &self,
        ctx: &UserContext,
        date: NaiveDate,
    ) -> Result<Option<WorkoutDay>> {
        let Some(plan) = self.db.get_active_plan(&ctx.user_id).await? else {
            debug!("No active plan for {}", ctx.user_id);
            return Ok(None);
        };
        if !plan_covers(&plan, date) {
            debug!("Plan {} does not cover {date}", plan.id);
            return Ok(None);
        }

        let day_of_week = weekday_index(date);
        self.db.get_workout_day(&plan.id, day_of_week).await
    }

    async fn owned_plan(&self, ctx: &UserContext, plan_id: &str) -> Result<WorkoutPlan> {
        let plan = self
            .db
            .get_plan(plan_id)
            .await?
            .with_context(|| format!("plan {plan_id} not found"))?;
        if plan.owner_id != ctx.user_id {
            bail!("plan {plan_id} does not belong to {}", ctx.user_id);
        }
        Ok(plan)
    }

    async fn edit_day<F>(
        &self,
        ctx: &UserContext,
        plan_id: &str,
        day_of_week: u8,
        edit: F,
    ) -> Result<WorkoutDay>
    where
        F: FnOnce(&mut WorkoutDay) -> Result<()>,
    {
        check_weekday(day_of_week)?;
        self.owned_plan(ctx, plan_id).await?;

        let mut day = self
            .db
            .get_workout_day(plan_id, day_of_week)
            .await?
            .unwrap_or_else(|| WorkoutDay::rest(plan_id, day_of_week));
        edit(&mut day)?;
        normalize_exercises(&mut day.exercises)?;

        self.db.upsert_workout_day(day).await
    }
}

/// 0 = Sunday, matching the stored `day_of_week`.
pub(crate) fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn plan_covers(plan: &WorkoutPlan, date: NaiveDate) -> bool {
    plan.start_date.map_or(true, |start| date >= start)
        && plan.end_date.map_or(true, |end| date <= end)
}

pub(crate) fn fill_week(plan_id: &str, stored: Vec<WorkoutDay>) -> Vec<WorkoutDay> {
    let mut week: Vec<WorkoutDay> = (0..DAYS_PER_WEEK)
        .map(|day_of_week| WorkoutDay::rest(plan_id, day_of_week))
        .collect();
    for day in stored {
        let slot = usize::from(day.day_of_week);
        if slot < week.len() {
            week[slot] = day;
        }
    }
    week
}

fn check_weekday(day_of_week: u8) -> Result<()> {
    if day_of_week >= DAYS_PER_WEEK {
        bail!("day_of_week must be 0-6, got {day_of_week}");
    }
    Ok(())
}

fn validate_draft(draft: &PlanDraft) -> Result<()> {
    if draft.name.trim().is_empty() {
        bail!("plan name is required");
    }
    if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
        if end < start {
            bail!("plan ends ({end}) before it starts ({start})");
        }
    }
    Ok(())
}

/// Trims names and checks each exercise. Completion is tracked by name, so
/// names within one day must be unique.
fn normalize_exercises(exercises: &mut [Exercise]) -> Result<()> {
    let mut seen = HashSet::new();
    for exercise in exercises.iter_mut() {
        let trimmed = exercise.name.trim();
        if trimmed.len() != exercise.name.len() {
            exercise.name = trimmed.to_string();
        }
        exercise.validate()?;
        if !seen.insert(exercise.name.clone()) {
            bail!("exercise '{}' appears twice in the same day", exercise.name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;

    fn user(id: &str) -> UserContext {
        UserContext {
            user_id: id.to_string(),
            email: format!("{id}@example.com"),
            role: Role::Standard,
        }
    }

    fn draft(name: &str) -> PlanDraft {
        PlanDraft {
            name: name.to_string(),
            ..PlanDraft::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn activating_b_leaves_only_b_active() {
        let editor = PlanEditor::new(Database::open_in_memory().unwrap());
        let me = user("u1");
        let a = editor.create_plan(&me, draft("A")).await.unwrap();
        let b = editor.create_plan(&me, draft("B")).await.unwrap();

        editor.activate_plan(&me, &a.id).await.unwrap();
        editor.activate_plan(&me, &b.id).await.unwrap();

        let active: Vec<_> = editor
            .list_plans(&me)
            .await
            .unwrap()
            .into_iter()
            .filter(|plan| plan.is_active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);
    }

    #[tokio::test]
    async fn other_users_cannot_touch_a_plan() {
        let editor = PlanEditor::new(Database::open_in_memory().unwrap());
        let plan = editor.create_plan(&user("u1"), draft("Mine")).await.unwrap();
        let intruder = user("u2");

        assert!(editor.activate_plan(&intruder, &plan.id).await.is_err());
        assert!(editor.delete_plan(&intruder, &plan.id).await.is_err());
        assert!(editor.week_schedule(&intruder, &plan.id).await.is_err());
        assert!(editor.set_rest_day(&intruder, &plan.id, 0).await.is_err());
    }

    #[tokio::test]
    async fn draft_validation() {
        let editor = PlanEditor::new(Database::open_in_memory().unwrap());
        let me = user("u1");

        assert!(editor.create_plan(&me, draft("   ")).await.is_err());
        let backwards = PlanDraft {
            name: "Backwards".into(),
            start_date: Some(date(2024, 2, 1)),
            end_date: Some(date(2024, 1, 1)),
        };
        assert!(editor.create_plan(&me, backwards).await.is_err());
    }

    #[tokio::test]
    async fn week_schedule_always_has_seven_slots() {
        let editor = PlanEditor::new(Database::open_in_memory().unwrap());
        let me = user("u1");
        let plan = editor.create_plan(&me, draft("Split")).await.unwrap();

        editor
            .set_workout_day(&me, &plan.id, 2, " Push ", vec![Exercise::new("Bench", 3, 8)])
            .await
            .unwrap();

        let week = editor.week_schedule(&me, &plan.id).await.unwrap();
        assert_eq!(week.len(), 7);
        assert!(week.iter().enumerate().all(|(i, d)| usize::from(d.day_of_week) == i));
        assert!(!week[2].is_rest_day);
        assert_eq!(week[2].workout_name, "Push");
        assert!(week[0].is_rest_day && week[0].id.is_none());
    }

    #[tokio::test]
    async fn exercise_list_edits() {
        let editor = PlanEditor::new(Database::open_in_memory().unwrap());
        let me = user("u1");
        let plan = editor.create_plan(&me, draft("Split")).await.unwrap();

        let day = editor
            .add_exercise(&me, &plan.id, 1, Exercise::new("Squat", 5, 5))
            .await
            .unwrap();
        assert!(!day.is_rest_day);

        editor
            .add_exercise(&me, &plan.id, 1, Exercise::new("Lunge", 3, 10))
            .await
            .unwrap();
        editor
            .add_exercise(&me, &plan.id, 1, Exercise::new("Calf Raise", 3, 15))
            .await
            .unwrap();

        let day = editor.move_exercise(&me, &plan.id, 1, 2, 0).await.unwrap();
        let names: Vec<_> = day.exercises.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Calf Raise", "Squat", "Lunge"]);

        let day = editor
            .update_exercise(&me, &plan.id, 1, 1, Exercise::new("Squat", 5, 3).with_weight(100.0))
            .await
            .unwrap();
        assert_eq!(day.exercises[1].weight, Some(100.0));

        let day = editor.remove_exercise(&me, &plan.id, 1, 0).await.unwrap();
        assert_eq!(day.exercises.len(), 2);

        assert!(editor.remove_exercise(&me, &plan.id, 1, 9).await.is_err());
        assert!(editor.move_exercise(&me, &plan.id, 1, 0, 5).await.is_err());
    }

    #[tokio::test]
    async fn invalid_exercises_are_rejected() {
        let editor = PlanEditor::new(Database::open_in_memory().unwrap());
        let me = user("u1");
        let plan = editor.create_plan(&me, draft("Split")).await.unwrap();

        assert!(editor
            .add_exercise(&me, &plan.id, 1, Exercise::new("Squat", 0, 5))
            .await
            .is_err());

        editor
            .add_exercise(&me, &plan.id, 1, Exercise::new("Squat", 5, 5))
            .await
            .unwrap();
        assert!(editor
            .add_exercise(&me, &plan.id, 1, Exercise::new("Squat", 3, 3))
            .await
            .is_err());
        assert!(editor.set_rest_day(&me, &plan.id, 7).await.is_err());

        let week = editor.week_schedule(&me, &plan.id).await.unwrap();
        assert_eq!(week[1].exercises.len(), 1);
    }

    #[tokio::test]
    async fn names_are_saved_trimmed() {
        let db = Database::open_in_memory().unwrap();
        let editor = PlanEditor::new(db.clone());
        let me = user("u1");
        let plan = editor.create_plan(&me, draft("Split")).await.unwrap();

        editor
            .set_workout_day(&me, &plan.id, 1, "Legs", vec![Exercise::new(" Squat ", 5, 5)])
            .await
            .unwrap();
        let day = editor
            .add_exercise(&me, &plan.id, 1, Exercise::new("Lunge\t", 3, 10))
            .await
            .unwrap();
        let names: Vec<_> = day.exercises.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Squat", "Lunge"]);
        assert!(editor
            .add_exercise(&me, &plan.id, 1, Exercise::new("Squat  ", 1, 1))
            .await
            .is_err());

        let monday = date(2024, 1, 8);
        let total = day.exercises.len();
        db.add_completed_exercise("u1", monday, "Squat", total).await.unwrap();
        let log = db.add_completed_exercise("u1", monday, "Lunge", total).await.unwrap();
        assert!(log.workout_completed);
        assert!(day
            .exercises
            .iter()
            .all(|e| log.completed_exercises.contains(&e.name)));
    }

    #[tokio::test]
    async fn workout_for_date_follows_active_plan_and_range() {
        let editor = PlanEditor::new(Database::open_in_memory().unwrap());
        let me = user("u1");
        let monday = date(2024, 1, 8);
        assert_eq!(weekday_index(monday), 1);

        assert!(editor.workout_for_date(&me, monday).await.unwrap().is_none());

        let plan = editor
            .create_plan(
                &me,
                PlanDraft {
                    name: "January".into(),
                    start_date: Some(date(2024, 1, 1)),
                    end_date: Some(date(2024, 1, 31)),
                },
            )
            .await
            .unwrap();
        editor
            .set_workout_day(&me, &plan.id, 1, "Legs", vec![Exercise::new("Squat", 5, 5)])
            .await
            .unwrap();
        editor.activate_plan(&me, &plan.id).await.unwrap();

        let day = editor.workout_for_date(&me, monday).await.unwrap().unwrap();
        assert_eq!(day.workout_name, "Legs");

        let tuesday = date(2024, 1, 9);
        assert!(editor.workout_for_date(&me, tuesday).await.unwrap().is_none());

        let february_monday = date(2024, 2, 5);
        assert!(editor
            .workout_for_date(&me, february_monday)
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn fill_week_ignores_out_of_range_rows() {
        let mut stray = WorkoutDay::rest("p", 9);
        stray.is_rest_day = false;
        let week = fill_week("p", vec![stray]);
        assert_eq!(week.len(), 7);
        assert!(week.iter().all(|d| d.is_rest_day));
    }
}
