pub mod controller;
pub mod launcher;
pub mod state;
mod timer;

pub use controller::{ProgressStore, SessionController, SessionEvent, SessionParams};
pub use launcher::SessionLauncher;
pub use state::{CompletionTrigger, SessionPhase, SessionSnapshot};
