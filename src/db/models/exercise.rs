use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_REST_SECS: u32 = 90;

/// One entry in a day's ordered exercise list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: Option<f64>,
    pub rest_seconds: Option<u32>,
    pub library_ref: Option<String>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, sets: u32, reps: u32) -> Self {
        Self {
            name: name.into(),
            sets,
            reps,
            weight: None,
            rest_seconds: None,
            library_ref: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_rest(mut self, rest_seconds: u32) -> Self {
        self.rest_seconds = Some(rest_seconds);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("exercise name is required");
        }
        if self.sets < 1 {
            bail!("exercise '{}' needs at least one set", self.name);
        }
        if self.reps < 1 {
            bail!("exercise '{}' needs at least one rep", self.name);
        }
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight < 0.0 {
                bail!("exercise '{}' has invalid weight {weight}", self.name);
            }
        }
        Ok(())
    }
}
