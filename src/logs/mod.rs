//! Per-day training logs and body-weight entries.

mod daily;
mod weight;

pub use daily::DailyLogService;
pub use weight::{parse_weight_input, WeightLogService};
