pub mod daily_log;
pub mod exercise;
pub mod library;
pub mod photo;
pub mod plan;
pub mod profile;
pub mod published;
pub mod weight_log;

pub use daily_log::{DailyLog, SessionProgress};
pub use exercise::{Exercise, DEFAULT_REST_SECS};
pub use library::{ExerciseLibraryItem, LibraryItemDraft};
pub use photo::ProgressPhoto;
pub use plan::{PlanDraft, WorkoutDay, WorkoutPlan, DAYS_PER_WEEK};
pub use profile::{Profile, Role};
pub use published::{PublishedPlan, PublishedWorkoutDay};
pub use weight_log::{WeightLog, WeightUnit};
