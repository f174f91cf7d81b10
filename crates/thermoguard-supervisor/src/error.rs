//! Error types for the supervisor.

use std::any::Any;
use std::path::PathBuf;
use thermoguard_ipc::ChannelError;
use thermoguard_relay::RelayError;
use thermoguard_timer::{TimerError, panic_message};
use thermoguard_watchdog::WatchdogError;
use thiserror::Error;

/// Result type for supervisor operations.
pub type SupervisorResult<T> = std::result::Result<T, SupervisorError>;

/// Errors raised while building, starting or stopping the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Invalid configuration provided.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The configuration file could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    ConfigIo {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`SupervisorConfig`](crate::SupervisorConfig).
    #[error("failed to parse config file {}: {source}", path.display())]
    ConfigParse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A channel could not be created.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A timer could not be created or started.
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// The heartbeat monitor or self-test could not be set up.
    #[error(transparent)]
    Watchdog(#[from] WatchdogError),

    /// The safety output rejected a command.
    #[error("safety output: {0}")]
    Relay(#[from] RelayError),

    /// A worker could not be started.
    #[error("worker '{worker}' failed to start: {reason}")]
    WorkerStart {
        /// Worker name.
        worker: String,
        /// Failure description.
        reason: String,
    },

    /// A worker thread panicked.
    #[error("worker '{worker}' panicked: {message}")]
    WorkerPanicked {
        /// Worker name.
        worker: String,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// The supervisor was already started or shut down.
    #[error("supervisor cannot start from state {0}")]
    InvalidLifecycle(&'static str),
}

impl SupervisorError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a worker start error.
    #[must_use]
    pub fn worker_start(worker: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::WorkerStart {
            worker: worker.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a worker panic error from a join payload.
    #[must_use]
    pub fn worker_panicked(worker: impl Into<String>, payload: &(dyn Any + Send)) -> Self {
        Self::WorkerPanicked {
            worker: worker.into(),
            message: panic_message(payload),
        }
    }
}
