//! Weekly schedule editing, the shared exercise library, and published templates.

mod editor;
mod library;
mod published;

pub use editor::PlanEditor;
pub use library::ExerciseLibrary;
pub use published::PublishedPlans;
