//! Error types for safety outputs and the relay board.

use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Relay and bus failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Relay ports are numbered 1 to 4.
    #[error("invalid relay port {port}, expected 1..={max}")]
    InvalidPort {
        /// The rejected port.
        port: u8,
        /// Highest valid port.
        max: u8,
    },

    /// A bus transfer failed.
    #[error("bus transfer to 0x{address:02x} register 0x{register:02x} failed: {reason}")]
    Bus {
        /// Device address.
        address: u8,
        /// Register address.
        register: u8,
        /// Failure description from the bus.
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("invalid relay configuration: {0}")]
    InvalidConfiguration(String),
}

impl RelayError {
    /// Create a bus error.
    #[must_use]
    pub fn bus(address: u8, register: u8, reason: impl Into<String>) -> Self {
        Self::Bus {
            address,
            register,
            reason: reason.into(),
        }
    }

    /// Whether the failure came from the bus rather than the caller.
    #[must_use]
    pub fn is_bus(&self) -> bool {
        matches!(self, Self::Bus { .. })
    }
}
