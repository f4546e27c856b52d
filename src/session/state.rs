//! Pure state of a guided workout session.
//!
//! Every user action and every rest-timer tick goes through [`SessionState::apply`],
//! which mutates the state and reports what changed as a [`Transition`]. Side
//! effects (timers, persistence, events) are the controller's job.

use std::collections::BTreeSet;

use anyhow::{bail, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::db::models::Exercise;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Exercise,
    Rest,
    Complete,
}

/// Why an exercise was marked completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CompletionTrigger {
    /// The last set was completed.
    SetsFinished,
    /// The user moved on with "next exercise"; set progress was not tracked.
    ManualSkip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    CompleteSet,
    Tick,
    SkipRest,
    TogglePause,
    NextExercise,
    PreviousExercise,
    JumpToExercise(usize),
}

/// What an action did. All flags false means the action was a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub changed: bool,
    pub newly_completed: Option<(String, CompletionTrigger)>,
    pub rest_started: bool,
    pub rest_ended: bool,
    pub workout_finished: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_exercise_index: usize,
    pub current_exercise: String,
    pub current_set: u32,
    pub total_sets: u32,
    pub phase: SessionPhase,
    pub rest_time_left: u32,
    pub is_paused: bool,
    pub completed_exercises: BTreeSet<String>,
    pub total_exercises: usize,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    exercises: Vec<Exercise>,
    current_exercise_index: usize,
    current_set: u32,
    phase: SessionPhase,
    rest_time_left: u32,
    is_paused: bool,
    completed_exercises: BTreeSet<String>,
    default_rest_secs: u32,
}

impl SessionState {
    /// Start at the first exercise not yet completed today, or at the top when all are.
    pub fn new(
        exercises: Vec<Exercise>,
        previously_completed: BTreeSet<String>,
        default_rest_secs: u32,
    ) -> Result<Self> {
        if exercises.is_empty() {
            bail!("cannot start a session without exercises");
        }

        let current_exercise_index = exercises
            .iter()
            .position(|exercise| !previously_completed.contains(&exercise.name))
            .unwrap_or(0);

        Ok(Self {
            exercises,
            current_exercise_index,
            current_set: 1,
            phase: SessionPhase::Exercise,
            rest_time_left: 0,
            is_paused: false,
            completed_exercises: previously_completed,
            default_rest_secs,
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_exercise_index(&self) -> usize {
        self.current_exercise_index
    }

    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    pub fn rest_time_left(&self) -> u32 {
        self.rest_time_left
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn completed_exercises(&self) -> &BTreeSet<String> {
        &self.completed_exercises
    }

    pub fn current_exercise(&self) -> &Exercise {
        &self.exercises[self.current_exercise_index]
    }

    /// True once every exercise in the list has been marked completed.
    pub fn all_completed(&self) -> bool {
        self.exercises
            .iter()
            .all(|exercise| self.completed_exercises.contains(&exercise.name))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let exercise = self.current_exercise();
        SessionSnapshot {
            current_exercise_index: self.current_exercise_index,
            current_exercise: exercise.name.clone(),
            current_set: self.current_set,
            total_sets: exercise.sets,
            phase: self.phase,
            rest_time_left: self.rest_time_left,
            is_paused: self.is_paused,
            completed_exercises: self.completed_exercises.clone(),
            total_exercises: self.exercises.len(),
        }
    }

    pub fn apply(&mut self, action: SessionAction) -> Transition {
        if self.phase == SessionPhase::Complete {
            return Transition::default();
        }

        match action {
            SessionAction::CompleteSet => self.complete_set(),
            SessionAction::Tick => self.tick(),
            SessionAction::SkipRest => self.skip_rest(),
            SessionAction::TogglePause => self.toggle_pause(),
            SessionAction::NextExercise => self.next_exercise(),
            SessionAction::PreviousExercise => self.previous_exercise(),
            SessionAction::JumpToExercise(index) => self.jump_to(index),
        }
    }

    /// Single entry point for both completion triggers. Returns false if the
    /// exercise was already completed; completed names are never removed.
    pub fn mark_complete(&mut self, index: usize, trigger: CompletionTrigger) -> bool {
        let Some(exercise) = self.exercises.get(index) else {
            return false;
        };
        let added = self.completed_exercises.insert(exercise.name.clone());
        if added {
            debug!("Exercise '{}' completed ({:?})", exercise.name, trigger);
        }
        added
    }

    fn complete_set(&mut self) -> Transition {
        if self.phase != SessionPhase::Exercise {
            return Transition::default();
        }

        let exercise = self.current_exercise();
        if self.current_set < exercise.sets {
            let rest = exercise.rest_seconds.unwrap_or(self.default_rest_secs);
            self.current_set += 1;
            if rest == 0 {
                return Transition {
                    changed: true,
                    ..Transition::default()
                };
            }
            self.phase = SessionPhase::Rest;
            self.rest_time_left = rest;
            self.is_paused = false;
            return Transition {
                changed: true,
                rest_started: true,
                ..Transition::default()
            };
        }

        let index = self.current_exercise_index;
        let name = exercise.name.clone();
        let mut transition = Transition {
            changed: true,
            ..Transition::default()
        };
        if self.mark_complete(index, CompletionTrigger::SetsFinished) {
            transition.newly_completed = Some((name, CompletionTrigger::SetsFinished));
        }

        if index + 1 < self.exercises.len() {
            self.current_exercise_index = index + 1;
            self.current_set = 1;
        } else {
            self.phase = SessionPhase::Complete;
            transition.workout_finished = true;
        }
        transition
    }

    fn tick(&mut self) -> Transition {
        if self.phase != SessionPhase::Rest || self.is_paused {
            return Transition::default();
        }

        self.rest_time_left = self.rest_time_left.saturating_sub(1);
        if self.rest_time_left > 0 {
            return Transition {
                changed: true,
                ..Transition::default()
            };
        }

        self.phase = SessionPhase::Exercise;
        Transition {
            changed: true,
            rest_ended: true,
            ..Transition::default()
        }
    }

    fn skip_rest(&mut self) -> Transition {
        if self.phase != SessionPhase::Rest {
            return Transition::default();
        }
        self.phase = SessionPhase::Exercise;
        self.rest_time_left = 0;
        self.is_paused = false;
        Transition {
            changed: true,
            rest_ended: true,
            ..Transition::default()
        }
    }

    fn toggle_pause(&mut self) -> Transition {
        if self.phase != SessionPhase::Rest {
            return Transition::default();
        }
        self.is_paused = !self.is_paused;
        Transition {
            changed: true,
            ..Transition::default()
        }
    }

    fn next_exercise(&mut self) -> Transition {
        if self.phase != SessionPhase::Exercise
            || self.current_exercise_index + 1 >= self.exercises.len()
        {
            return Transition::default();
        }

        let leaving = self.current_exercise_index;
        let name = self.exercises[leaving].name.clone();
        let newly_completed = self
            .mark_complete(leaving, CompletionTrigger::ManualSkip)
            .then_some((name, CompletionTrigger::ManualSkip));

        let mut transition = self.move_to(leaving + 1);
        transition.newly_completed = newly_completed;
        transition
    }

    fn previous_exercise(&mut self) -> Transition {
        if self.phase != SessionPhase::Exercise || self.current_exercise_index == 0 {
            return Transition::default();
        }
        self.move_to(self.current_exercise_index - 1)
    }

    fn jump_to(&mut self, index: usize) -> Transition {
        if index >= self.exercises.len() {
            return Transition::default();
        }
        self.move_to(index)
    }

    fn move_to(&mut self, index: usize) -> Transition {
        let was_resting = self.phase == SessionPhase::Rest;
        self.current_exercise_index = index;
        self.current_set = 1;
        self.phase = SessionPhase::Exercise;
        self.rest_time_left = 0;
        self.is_paused = false;
        Transition {
            changed: true,
            rest_ended: was_resting,
            ..Transition::default()
        }
    }
}
