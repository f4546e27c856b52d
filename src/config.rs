use std::{path::PathBuf, time::Duration};

const DEFAULT_DATA_DIR: &str = ".fitplan";
const DEFAULT_TICK_MS: u64 = 1000;

/// Process-level configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub debug: bool,
    /// Interval of the rest countdown. One tick always removes one second of rest.
    pub rest_tick: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            debug: false,
            rest_tick: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("FITPLAN_DATA_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let debug = lookup("FITPLAN_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let rest_tick = lookup("FITPLAN_REST_TICK_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.rest_tick);

        Self {
            data_dir,
            debug,
            rest_tick,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("fitplan.sqlite3")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}
