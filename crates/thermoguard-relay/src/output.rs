//! Safety output trait.
//!
//! The safety output is the single physical effect of supervision: it is
//! driven **on** while the appliance is healthy and **off** as soon as any
//! fault is active. Off is the safe state.

use crate::error::RelayResult;

/// Binary output that gates the appliance.
///
/// # Implementation Requirements
///
/// 1. `on()` and `off()` MUST be idempotent and safe to call every tick
/// 2. `off()` MUST leave the hardware in the safe state even if called
///    before any `on()`
/// 3. `is_on()` MUST reflect the last successful command
pub trait SafetyOutput: Send {
    /// Energize the output (normal operation).
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware rejected the command.
    fn on(&mut self) -> RelayResult<()>;

    /// De-energize the output (safe state).
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware rejected the command.
    fn off(&mut self) -> RelayResult<()>;

    /// Whether the output is currently energized.
    fn is_on(&self) -> bool;

    /// Drive the output to `on`.
    ///
    /// # Errors
    ///
    /// Propagates the error of [`on`](Self::on) or [`off`](Self::off).
    fn set(&mut self, on: bool) -> RelayResult<()> {
        if on { self.on() } else { self.off() }
    }
}

impl<T: SafetyOutput + ?Sized> SafetyOutput for Box<T> {
    fn on(&mut self) -> RelayResult<()> {
        (**self).on()
    }

    fn off(&mut self) -> RelayResult<()> {
        (**self).off()
    }

    fn is_on(&self) -> bool {
        (**self).is_on()
    }
}
