//! Runtime configuration.
//!
//! Everything here has a sensible default, so an empty TOML document is a valid
//! configuration. Extra controller models can be described in the same file:
//!
//! ```toml
//! [enumerator]
//! rescan_interval_ms = 250
//! read_retries = 3
//!
//! [[profiles]]
//! name = "My Stick"
//! descriptors = [{ vendor_id = 0x1234, product_id = 0x0001 }]
//! axes = [{ name = "x", code = 0, min = 0, max = 4095 }]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::profile::ModelProfile;

/// Tuning for the [`Enumerator`](crate::enumerator::Enumerator) and its hotplug thread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumeratorConfig {
    /// How often polling hotplug monitors rescan the bus.
    pub rescan_interval_ms: u64,
    /// How many times a `Busy` read is retried before the device is treated as lost.
    pub read_retries: u32,
    /// Upper bound on events drained from one device per state query.
    pub max_events_per_drain: usize,
    /// Pause after a hotplug monitor error before waiting again.
    pub error_backoff_ms: u64,
}

impl Default for EnumeratorConfig {
    fn default() -> Self {
        Self {
            rescan_interval_ms: 500,
            read_retries: 3,
            max_events_per_drain: 256,
            error_backoff_ms: 1000,
        }
    }
}

impl EnumeratorConfig {
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms.max(1))
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Top-level configuration document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enumerator: EnumeratorConfig,
    /// Additional controller models, on top of the built-in ones.
    pub profiles: Vec<ModelProfile>,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enumerator.max_events_per_drain == 0 {
            return Err(ConfigError::Invalid(
                "enumerator.max_events_per_drain must be at least 1".into(),
            ));
        }
        self.profiles.iter().try_for_each(ModelProfile::validate)
    }

    /// Built-in profiles followed by the configured ones.
    pub fn all_profiles(&self) -> Vec<ModelProfile> {
        let mut profiles = crate::models::builtin_profiles();
        profiles.extend(self.profiles.iter().cloned());
        profiles
    }
}
