use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::db::models::{WeightUnit, DEFAULT_REST_SECS};

const DEFAULT_COMPLETION_CLOSE_DELAY_SECS: u64 = 3;

/// User preferences that shape guided sessions and weight entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// Rest applied to exercises that do not carry their own `rest_seconds`.
    pub default_rest_secs: u32,
    pub weight_unit: WeightUnit,
    /// How long the "workout complete" screen stays up before the session closes itself.
    pub completion_close_delay_secs: u64,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_rest_secs: DEFAULT_REST_SECS,
            weight_unit: WeightUnit::Kg,
            completion_close_delay_secs: DEFAULT_COMPLETION_CLOSE_DELAY_SECS,
        }
    }
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    /// Settings that live only for the process, never written to disk.
    pub fn ephemeral(data: UserSettings) -> Self {
        Self {
            path: None,
            data: RwLock::new(data),
        }
    }

    pub fn get(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: UserSettings) -> Result<()> {
        if settings.completion_close_delay_secs > 60 {
            bail!("completion close delay must be at most 60 seconds");
        }
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("fitplan-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(scratch_path()).unwrap();
        let settings = store.get();
        assert_eq!(settings.default_rest_secs, 90);
        assert_eq!(settings.completion_close_delay_secs, 3);
        assert_eq!(settings.weight_unit, WeightUnit::Kg);
    }

    #[test]
    fn updates_survive_reload() {
        let path = scratch_path();
        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update(UserSettings {
                default_rest_secs: 60,
                weight_unit: WeightUnit::Lbs,
                completion_close_delay_secs: 5,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path.clone()).unwrap().get();
        assert_eq!(reloaded.default_rest_secs, 60);
        assert_eq!(reloaded.weight_unit, WeightUnit::Lbs);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = scratch_path();
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.get(), UserSettings::default());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let path = scratch_path();
        fs::write(&path, r#"{"weightUnit":"lbs"}"#).unwrap();
        let settings = SettingsStore::new(path.clone()).unwrap().get();
        assert_eq!(settings.weight_unit, WeightUnit::Lbs);
        assert_eq!(settings.default_rest_secs, 90);
        let _ = fs::remove_file(path);
    }
}
