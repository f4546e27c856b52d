//! Weekly and monthly statistics derived from daily and weight logs.

mod aggregate;
mod service;
mod window;

pub use aggregate::{
    calendar, completion_percent, format_weight_change, heatmap, streak_days, summarize,
    weight_change, CalendarCell, HeatLevel, HeatmapCell, ProgressSummary, WeightChange,
};
pub use service::ProgressService;
pub use window::ProgressWindow;
