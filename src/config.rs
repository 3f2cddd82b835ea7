//! Relay configuration
//!
//! Loaded from JSON; every field has a default so an empty object (or no file
//! at all) yields the stock behaviour: no throttling, audio relayed, delivery
//! active.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Minimum spacing between delivered records of the same report kind.
    /// `None` disables throttling.
    pub throttle_interval_ms: Option<u64>,
    /// Forward device audio state/result events
    pub relay_audio: bool,
    /// Start with delivery paused (host UI in background)
    pub start_paused: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            throttle_interval_ms: None,
            relay_audio: true,
            start_paused: false,
        }
    }
}

impl RelayConfig {
    pub fn from_json(json: &str) -> Result<Self, RelayError> {
        let config: RelayConfig = serde_json::from_str(json)
            .map_err(|e| RelayError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.throttle_interval_ms == Some(0) {
            return Err(RelayError::ConfigError(
                "throttle_interval_ms must be positive (omit it to disable throttling)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, RelayError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
