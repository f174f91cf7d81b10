//! Prelude for thermoguard-timer.

pub use crate::error::{TimerError, TimerResult};
pub use crate::timer::{PeriodicTimer, TimerHandle, TimerPhase, TimerPolicy};
