//! Error types for heartbeat monitoring and channel self-tests.

use thermoguard_timer::TimerError;
use thiserror::Error;

/// Result type for watchdog operations.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;

/// Errors that can occur while configuring or running the watchdogs.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// A worker with this name is already monitored.
    #[error("worker '{0}' is already monitored")]
    DuplicateWorker(String),

    /// Invalid configuration provided.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The self-test cycle timer failed.
    #[error("self-test timer: {0}")]
    Timer(#[from] TimerError),
}

impl WatchdogError {
    /// Create a duplicate worker error.
    #[must_use]
    pub fn duplicate_worker(name: impl Into<String>) -> Self {
        Self::DuplicateWorker(name.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
