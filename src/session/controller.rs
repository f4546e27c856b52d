use std::{
    collections::BTreeSet,
    future::Future,
    sync::{Arc, Mutex as StdMutex, MutexGuard, Weak},
    time::Duration,
};

use anyhow::Result;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};

use crate::{
    db::{
        models::{Exercise, SessionProgress},
        Database,
    },
    notify::Notifier,
};

use super::{
    state::{CompletionTrigger, SessionAction, SessionPhase, SessionSnapshot, SessionState, Transition},
    timer::TimerGuard,
};

const EVENT_CAPACITY: usize = 128;

/// Where a running session writes its completed-exercise snapshots.
pub trait ProgressStore: Send + Sync + 'static {
    /// Returns whether the stored log changed.
    fn save_progress(&self, progress: SessionProgress) -> impl Future<Output = Result<bool>> + Send;
}

impl ProgressStore for Database {
    fn save_progress(&self, progress: SessionProgress) -> impl Future<Output = Result<bool>> + Send {
        self.apply_session_progress(progress)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    StateChanged {
        snapshot: SessionSnapshot,
    },
    RestTick {
        rest_time_left: u32,
    },
    ExerciseCompleted {
        name: String,
        trigger: CompletionTrigger,
    },
    WorkoutComplete {
        completed_exercises: BTreeSet<String>,
    },
    Closed {
        completed_exercises: BTreeSet<String>,
    },
}

#[derive(Debug, Clone)]
pub struct SessionParams {
    pub owner_id: String,
    pub log_date: NaiveDate,
    pub exercises: Vec<Exercise>,
    /// Names already completed today; decides where the session resumes.
    pub previously_completed: BTreeSet<String>,
    pub default_rest_secs: u32,
    pub tick_interval: Duration,
    pub close_delay: Duration,
}

/// Everything that changes while the session runs. Timers are started and
/// dropped only while this is locked.
struct Runtime {
    machine: SessionState,
    closed: bool,
    sequence: u64,
    rest_timer: Option<TimerGuard>,
    /// Identifies the live rest ticker; ticks from older tickers are ignored.
    rest_generation: u64,
    auto_close: Option<TimerGuard>,
}

struct SessionInner<S> {
    runtime: Mutex<Runtime>,
    owner_id: String,
    log_date: NaiveDate,
    planned_exercises: BTreeSet<String>,
    store: Arc<S>,
    notifier: Notifier,
    events: broadcast::Sender<SessionEvent>,
    writes: StdMutex<Vec<JoinHandle<()>>>,
    tick_interval: Duration,
    close_delay: Duration,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: ProgressStore> SessionInner<S> {
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn next_progress(&self, runtime: &mut Runtime) -> SessionProgress {
        runtime.sequence += 1;
        SessionProgress {
            owner_id: self.owner_id.clone(),
            log_date: self.log_date,
            completed_exercises: runtime.machine.completed_exercises().clone(),
            planned_exercises: self.planned_exercises.clone(),
            sequence: runtime.sequence,
        }
    }

    /// Fire-and-forget write of a completed-set snapshot. Failures are reported, never retried.
    fn spawn_write(&self, progress: SessionProgress) {
        let store = self.store.clone();
        let notifier = self.notifier.clone();

        let handle = tokio::spawn(async move {
            let sequence = progress.sequence;
            match store.save_progress(progress).await {
                Ok(true) => debug!("Saved session progress #{sequence}"),
                Ok(false) => debug!("Session progress #{sequence} already recorded"),
                Err(err) => notifier.report_failure("save your workout progress", &err),
            }
        });

        let mut writes = lock(&self.writes);
        writes.retain(|pending| !pending.is_finished());
        writes.push(handle);
    }
}

/// Runs one guided workout: owns the state machine, its rest timer and the
/// auto-close after completion. Clones share the same session; dropping the
/// last clone cancels any pending timer.
pub struct SessionController<S: ProgressStore = Database> {
    inner: Arc<SessionInner<S>>,
}

impl<S: ProgressStore> Clone for SessionController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ProgressStore> SessionController<S> {
    pub fn start(store: Arc<S>, notifier: Notifier, params: SessionParams) -> Result<Self> {
        let planned_exercises = params
            .exercises
            .iter()
            .map(|exercise| exercise.name.clone())
            .collect();
        let machine = SessionState::new(
            params.exercises,
            params.previously_completed,
            params.default_rest_secs,
        )?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        info!(
            "Session started for {} on {} at exercise {}",
            params.owner_id,
            params.log_date,
            machine.current_exercise_index()
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                runtime: Mutex::new(Runtime {
                    machine,
                    closed: false,
                    sequence: 0,
                    rest_timer: None,
                    rest_generation: 0,
                    auto_close: None,
                }),
                owner_id: params.owner_id,
                log_date: params.log_date,
                planned_exercises,
                store,
                notifier,
                events,
                writes: StdMutex::new(Vec::new()),
                tick_interval: params.tick_interval,
                close_delay: params.close_delay,
            }),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn log_date(&self) -> NaiveDate {
        self.inner.log_date
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.runtime.lock().await.machine.snapshot()
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.runtime.lock().await.closed
    }

    pub async fn complete_set(&self) -> SessionSnapshot {
        self.dispatch(SessionAction::CompleteSet).await
    }

    pub async fn skip_rest(&self) -> SessionSnapshot {
        self.dispatch(SessionAction::SkipRest).await
    }

    pub async fn toggle_pause(&self) -> SessionSnapshot {
        self.dispatch(SessionAction::TogglePause).await
    }

    pub async fn next_exercise(&self) -> SessionSnapshot {
        self.dispatch(SessionAction::NextExercise).await
    }

    pub async fn previous_exercise(&self) -> SessionSnapshot {
        self.dispatch(SessionAction::PreviousExercise).await
    }

    pub async fn jump_to_exercise(&self, index: usize) -> SessionSnapshot {
        self.dispatch(SessionAction::JumpToExercise(index)).await
    }

    /// Persist the current completed set and stop every timer. Does not mark the
    /// exercise in progress as completed. Closing twice is a no-op.
    pub async fn close(&self) -> SessionSnapshot {
        let mut runtime = self.inner.runtime.lock().await;
        let snapshot = runtime.machine.snapshot();
        if runtime.closed {
            return snapshot;
        }
        runtime.closed = true;
        runtime.rest_timer = None;
        runtime.auto_close = None;

        let progress = self.inner.next_progress(&mut runtime);
        let completed_exercises = progress.completed_exercises.clone();
        self.inner.spawn_write(progress);
        self.inner.emit(SessionEvent::Closed {
            completed_exercises,
        });

        info!(
            "Session closed for {} on {} with {}/{} exercises completed",
            self.inner.owner_id,
            self.inner.log_date,
            snapshot.completed_exercises.len(),
            snapshot.total_exercises
        );
        snapshot
    }

    /// Wait for every write issued so far to finish.
    pub async fn flush(&self) {
        let pending: Vec<_> = lock(&self.inner.writes).drain(..).collect();
        for handle in pending {
            if let Err(err) = handle.await {
                warn!("Session progress write task failed: {err}");
            }
        }
    }

    async fn dispatch(&self, action: SessionAction) -> SessionSnapshot {
        let mut runtime = self.inner.runtime.lock().await;
        if runtime.closed {
            return runtime.machine.snapshot();
        }
        let transition = runtime.machine.apply(action);
        let snapshot = runtime.machine.snapshot();
        self.apply_effects(&mut runtime, transition, &snapshot);
        snapshot
    }

    fn apply_effects(&self, runtime: &mut Runtime, transition: Transition, snapshot: &SessionSnapshot) {
        if transition.rest_ended {
            runtime.rest_timer = None;
        }
        if transition.rest_started {
            self.start_rest_timer(runtime);
        }

        if let Some((name, trigger)) = transition.newly_completed {
            self.inner.emit(SessionEvent::ExerciseCompleted { name, trigger });
            let progress = self.inner.next_progress(runtime);
            self.inner.spawn_write(progress);
        }

        if transition.changed {
            self.inner.emit(SessionEvent::StateChanged {
                snapshot: snapshot.clone(),
            });
        }

        if transition.workout_finished {
            self.inner.emit(SessionEvent::WorkoutComplete {
                completed_exercises: snapshot.completed_exercises.clone(),
            });
            self.schedule_close(runtime);
        }
    }

    /// One second of rest has elapsed. Returns whether the countdown should keep running.
    async fn on_tick(&self, generation: u64) -> bool {
        let mut runtime = self.inner.runtime.lock().await;
        if runtime.closed || runtime.rest_generation != generation {
            return false;
        }
        let transition = runtime.machine.apply(SessionAction::Tick);
        let snapshot = runtime.machine.snapshot();

        if transition.rest_ended {
            runtime.rest_timer = None;
            self.inner.emit(SessionEvent::StateChanged { snapshot });
            return false;
        }
        if transition.changed {
            self.inner.emit(SessionEvent::RestTick {
                rest_time_left: snapshot.rest_time_left,
            });
        }
        snapshot.phase == SessionPhase::Rest
    }

    fn start_rest_timer(&self, runtime: &mut Runtime) {
        runtime.rest_generation += 1;
        let generation = runtime.rest_generation;
        let session = Arc::downgrade(&self.inner);
        runtime.rest_timer = Some(TimerGuard::every(self.inner.tick_interval, move || {
            let session: Weak<SessionInner<S>> = session.clone();
            async move {
                match session.upgrade() {
                    Some(inner) => SessionController { inner }.on_tick(generation).await,
                    None => false,
                }
            }
        }));
    }

    fn schedule_close(&self, runtime: &mut Runtime) {
        let session = Arc::downgrade(&self.inner);
        runtime.auto_close = Some(TimerGuard::after(self.inner.close_delay, async move {
            if let Some(inner) = session.upgrade() {
                SessionController { inner }.close().await;
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use tokio::time;

    use crate::notify::NotificationLevel;

    #[derive(Default)]
    struct RecordingStore {
        saved: StdMutex<Vec<SessionProgress>>,
        offline: bool,
    }

    impl RecordingStore {
        fn saved(&self) -> Vec<SessionProgress> {
            lock(&self.saved).clone()
        }
    }

    impl ProgressStore for RecordingStore {
        fn save_progress(
            &self,
            progress: SessionProgress,
        ) -> impl Future<Output = Result<bool>> + Send {
            async move {
                if self.offline {
                    bail!("network unreachable");
                }
                lock(&self.saved).push(progress);
                Ok(true)
            }
        }
    }

    fn params(exercises: Vec<Exercise>) -> SessionParams {
        SessionParams {
            owner_id: "u1".into(),
            log_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            exercises,
            previously_completed: BTreeSet::new(),
            default_rest_secs: 90,
            tick_interval: Duration::from_secs(1),
            close_delay: Duration::from_secs(3),
        }
    }

    fn start(
        store: &Arc<RecordingStore>,
        exercises: Vec<Exercise>,
    ) -> SessionController<RecordingStore> {
        SessionController::start(store.clone(), Notifier::new(), params(exercises)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn rest_countdown_returns_to_exercise() {
        let store = Arc::new(RecordingStore::default());
        let session = start(&store, vec![Exercise::new("Squat", 2, 5).with_rest(3)]);

        let snap = session.complete_set().await;
        assert_eq!(snap.phase, SessionPhase::Rest);
        assert_eq!(snap.rest_time_left, 3);

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(session.snapshot().await.rest_time_left, 2);

        time::sleep(Duration::from_secs(2)).await;
        let snap = session.snapshot().await;
        assert_eq!(snap.phase, SessionPhase::Exercise);
        assert_eq!(snap.current_set, 2);
        assert_eq!(snap.current_exercise_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_rest_holds_its_remaining_time() {
        let store = Arc::new(RecordingStore::default());
        let session = start(&store, vec![Exercise::new("Squat", 2, 5).with_rest(5)]);

        session.complete_set().await;
        time::sleep(Duration::from_millis(2500)).await;
        let paused = session.toggle_pause().await;
        assert!(paused.is_paused);
        assert_eq!(paused.rest_time_left, 3);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(session.snapshot().await.rest_time_left, 3);

        session.toggle_pause().await;
        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(session.snapshot().await.phase, SessionPhase::Exercise);
    }

    #[tokio::test(start_paused = true)]
    async fn every_completion_writes_the_full_set() {
        let store = Arc::new(RecordingStore::default());
        let session = start(
            &store,
            vec![Exercise::new("Squat", 1, 5), Exercise::new("Bench", 1, 5)],
        );

        session.complete_set().await;
        session.complete_set().await;
        session.flush().await;

        let saved = store.saved();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].sequence, 1);
        assert_eq!(saved[0].completed_exercises.len(), 1);
        assert_eq!(saved[1].sequence, 2);
        assert_eq!(saved[1].completed_exercises, saved[1].planned_exercises);
        assert_eq!(saved[1].planned_exercises.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_skip_persists_like_a_finished_exercise() {
        let store = Arc::new(RecordingStore::default());
        let session = start(
            &store,
            vec![Exercise::new("Squat", 3, 5), Exercise::new("Bench", 3, 5)],
        );
        let mut events = session.subscribe();

        session.next_exercise().await;
        session.flush().await;

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].completed_exercises.contains("Squat"));

        match events.recv().await.unwrap() {
            SessionEvent::ExerciseCompleted { name, trigger } => {
                assert_eq!(name, "Squat");
                assert_eq!(trigger, CompletionTrigger::ManualSkip);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn finished_workout_closes_itself_after_delay() {
        let store = Arc::new(RecordingStore::default());
        let session = start(&store, vec![Exercise::new("Row", 1, 10)]);

        let snap = session.complete_set().await;
        assert_eq!(snap.phase, SessionPhase::Complete);
        assert!(!session.is_closed().await);

        time::sleep(Duration::from_millis(2900)).await;
        assert!(!session.is_closed().await);

        time::sleep(Duration::from_millis(200)).await;
        assert!(session.is_closed().await);

        session.flush().await;
        let saved = store.saved();
        assert_eq!(saved.len(), 2);
        assert!(saved
            .iter()
            .all(|p| p.completed_exercises.contains("Row")));
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_the_countdown_and_persists_snapshot() {
        let store = Arc::new(RecordingStore::default());
        let session = start(&store, vec![Exercise::new("Squat", 3, 5)]);

        session.complete_set().await;
        time::sleep(Duration::from_millis(1500)).await;
        let closed = session.close().await;
        assert_eq!(closed.rest_time_left, 89);

        time::sleep(Duration::from_secs(120)).await;
        let snap = session.snapshot().await;
        assert_eq!(snap.rest_time_left, 89);
        assert_eq!(snap.phase, SessionPhase::Rest);

        // Actions after close change nothing.
        session.skip_rest().await;
        assert_eq!(session.snapshot().await.phase, SessionPhase::Rest);

        session.flush().await;
        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].completed_exercises.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_notifies_and_keeps_state() {
        let store = Arc::new(RecordingStore {
            offline: true,
            ..RecordingStore::default()
        });
        let notifier = Notifier::new();
        let mut notes = notifier.subscribe();
        let session = SessionController::start(
            store.clone(),
            notifier,
            params(vec![Exercise::new("Squat", 1, 5), Exercise::new("Bench", 1, 5)]),
        )
        .unwrap();

        let snap = session.complete_set().await;
        session.flush().await;

        assert!(snap.completed_exercises.contains("Squat"));
        assert_eq!(snap.current_exercise_index, 1);
        assert_eq!(notes.recv().await.unwrap().level, NotificationLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn resumed_session_writes_only_its_own_progress() {
        let store = Arc::new(RecordingStore::default());
        let mut seeded = params(vec![Exercise::new("Squat", 1, 5), Exercise::new("Bench", 1, 5)]);
        seeded.previously_completed = ["Squat".to_string()].into_iter().collect();
        let session = SessionController::start(store.clone(), Notifier::new(), seeded).unwrap();

        let snap = session.snapshot().await;
        assert_eq!(snap.current_exercise, "Bench");

        session.complete_set().await;
        session.flush().await;
        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].sequence, 1);
        assert_eq!(saved[0].completed_exercises, saved[0].planned_exercises);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_mid_rest_stops_the_session() {
        let store = Arc::new(RecordingStore::default());
        let session = start(&store, vec![Exercise::new("Squat", 3, 5).with_rest(5)]);
        let mut events = session.subscribe();

        assert_eq!(session.complete_set().await.phase, SessionPhase::Rest);
        time::sleep(Duration::from_millis(1500)).await;
        while events.try_recv().is_ok() {}

        drop(session);
        time::sleep(Duration::from_secs(30)).await;

        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
        assert!(store.saved().is_empty());
        assert_eq!(Arc::strong_count(&store), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skipped_rest_ignores_ticks_from_the_old_countdown() {
        let store = Arc::new(RecordingStore::default());
        let session = start(&store, vec![Exercise::new("Squat", 3, 5).with_rest(3)]);

        session.complete_set().await;
        time::sleep(Duration::from_millis(500)).await;
        session.skip_rest().await;
        let resting = session.complete_set().await;
        assert_eq!(resting.current_set, 3);
        assert_eq!(resting.rest_time_left, 3);

        // Exactly one countdown is running: one second removes one second.
        time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(session.snapshot().await.rest_time_left, 2);
        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn session_keeps_exercises_marked_outside_it() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let session = SessionController::start(
            db.clone(),
            Notifier::new(),
            params(vec![Exercise::new("Squat", 1, 5), Exercise::new("Bench", 3, 5)]),
        )
        .unwrap();
        let date = session.log_date();
        db.add_completed_exercise("u1", date, "Calf", 3).await.unwrap();

        session.complete_set().await;
        session.flush().await;
        let log = db.get_daily_log("u1", date).await.unwrap().unwrap();
        let names: Vec<_> = log.completed_exercises.iter().map(String::as_str).collect();
        assert_eq!(names, ["Calf", "Squat"]);
        assert!(!log.workout_completed);

        session.close().await;
        session.flush().await;
        let log = db.get_daily_log("u1", date).await.unwrap().unwrap();
        let names: Vec<_> = log.completed_exercises.iter().map(String::as_str).collect();
        assert_eq!(names, ["Calf", "Squat"]);
    }

    #[tokio::test]
    async fn database_store_counts_each_change_once() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let session = SessionController::start(
            db.clone(),
            Notifier::new(),
            params(vec![Exercise::new("Squat", 1, 5), Exercise::new("Bench", 1, 5)]),
        )
        .unwrap();

        session.complete_set().await;
        session.complete_set().await;
        session.flush().await;

        let log = db
            .get_daily_log("u1", session.log_date())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.completed_exercises.len(), 2);
        assert!(log.workout_completed);
        assert_eq!(log.revision, 2);
    }
}
