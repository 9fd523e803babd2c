//! Error types.
//!
//! Only construction-time and I/O-level failures are errors. Ordinary lifecycle
//! transitions (a controller being unplugged, a stale id being queried) are reported
//! through [`DeviceStateChange`](crate::event::DeviceStateChange) events and `Option`
//! results instead.

use std::path::PathBuf;

/// Failures reported by a platform [`Backend`](crate::backends::Backend).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The driver / OS API needed by the backend could not be initialized.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A single device could not be opened. Enumeration skips it.
    #[error("failed to open {locator}: {reason}")]
    Open { locator: String, reason: String },

    /// The backend produced something it could not make sense of.
    #[error("malformed backend event: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures of [`Enumerator::start`](crate::enumerator::Enumerator::start).
#[derive(Debug, thiserror::Error)]
pub enum EnumeratorError {
    /// Backend initialization failed. Fatal to every service depending on this enumerator.
    #[error("backend initialization failed: {0}")]
    BackendUnavailable(#[source] BackendError),

    /// The enumerator has already been shut down.
    #[error("enumerator has been shut down")]
    ShutDown,

    /// The hotplug thread could not be spawned.
    #[error("failed to spawn hotplug thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Failures while loading a [`Config`](crate::config::Config) or
/// [`ModelProfile`](crate::profile::ModelProfile).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// The document parsed but describes something unusable (e.g. an axis with `min == max`).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
