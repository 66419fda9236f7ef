/*!

Simulation parameters as supplied by a caller or a JSON file. JSON field names are camelCase
except for the contact radius, which is `R0_radius`. Any omitted field falls back to its
default.

```json
{ "size": 200, "days": 100, "initialInfected": 20, "beta": 0.18, "gamma": 0.08,
  "delta": 0.002, "R0_radius": 1, "numThreads": 4, "seed": 7 }
```

*/

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Configuration {
    /// Side length of the square grid. The population is `size * size`.
    pub size: usize,
    /// Maximum number of simulated days.
    pub days: u32,
    pub initial_infected: usize,
    /// Per-contact infection probability.
    pub beta: f64,
    /// Daily recovery probability.
    pub gamma: f64,
    /// Daily death probability.
    pub delta: f64,
    /// Chebyshev contact radius.
    #[serde(rename = "R0_radius")]
    pub radius: usize,
    pub num_threads: usize,
    /// Global seed shared by both engines so their runs can be compared day by day.
    pub seed: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            size: 1000,
            days: 365,
            initial_infected: 10,
            beta: 0.3,
            gamma: 0.1,
            delta: 0.01,
            radius: 1,
            num_threads: 4,
            seed: 0,
        }
    }
}

/// The three rates and the contact radius, everything the transition rule needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRates {
    pub beta: f64,
    pub gamma: f64,
    pub delta: f64,
    pub radius: usize,
}

impl Configuration {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.size == 0 {
            return Err(SimError::config("size must be positive"));
        }
        if self.size.checked_mul(self.size).is_none() {
            return Err(SimError::config(format!(
                "size {} is too large: size * size overflows usize",
                self.size
            )));
        }
        if self.days == 0 {
            return Err(SimError::config("days must be positive"));
        }
        if self.radius == 0 {
            return Err(SimError::config("R0_radius must be at least 1"));
        }
        if self.num_threads == 0 {
            return Err(SimError::config("numThreads must be at least 1"));
        }
        self.rates().validate()
    }

    #[must_use]
    pub fn rates(&self) -> ModelRates {
        ModelRates {
            beta: self.beta,
            gamma: self.gamma,
            delta: self.delta,
            radius: self.radius,
        }
    }

    /// Total number of cells, `size * size`.
    #[must_use]
    pub fn population(&self) -> u64 {
        (self.size as u64) * (self.size as u64)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let config: Configuration = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

impl ModelRates {
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in [("beta", self.beta), ("gamma", self.gamma), ("delta", self.delta)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimError::config(format!("{name} must be in [0, 1], got {value}")));
            }
        }
        if self.delta + self.gamma > 1.0 {
            return Err(SimError::config(format!(
                "delta + gamma must not exceed 1, got {}",
                self.delta + self.gamma
            )));
        }
        if self.radius == 0 {
            return Err(SimError::config("R0_radius must be at least 1"));
        }
        Ok(())
    }
}
