//! Error types for periodic timers.

use std::any::Any;

/// Result type for timer operations.
pub type TimerResult<T> = std::result::Result<T, TimerError>;

/// Timer failures.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// Timer names must be 3 to 50 characters long.
    #[error("invalid timer name '{name}': {len} characters, expected {min}..={max}")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Its length in characters.
        len: usize,
        /// Minimum accepted length.
        min: usize,
        /// Maximum accepted length.
        max: usize,
    },
    /// `start` was called more than once.
    #[error("timer '{0}' was already started")]
    AlreadyStarted(String),
    /// The timer thread could not be spawned.
    #[error("failed to spawn timer '{name}': {source}")]
    Spawn {
        /// Timer name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// The timer thread panicked.
    #[error("timer '{name}' thread panicked: {message}")]
    Panicked {
        /// Timer name.
        name: String,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl TimerError {
    /// Create a spawn error.
    #[must_use]
    pub fn spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source,
        }
    }

    /// Create a panicked-thread error from a join payload.
    #[must_use]
    pub fn panicked(name: impl Into<String>, payload: &(dyn Any + Send)) -> Self {
        Self::Panicked {
            name: name.into(),
            message: panic_message(payload),
        }
    }
}

/// Text of a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
