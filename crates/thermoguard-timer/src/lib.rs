//! # thermoguard-timer
//!
//! Periodic timers that pace thermoguard supervision cycles.
//!
//! A [`PeriodicTimer`] waits for its interval, runs its callback once on its
//! own thread, and then parks until the owner calls `restart` or `shutdown`.
//! The owner decides when the next cycle begins, which keeps the check cadence
//! tied to the owner's processing loop rather than to wall-clock drift.
//!
//! ## Error Policy
//!
//! Callback errors are logged at error level. Under [`TimerPolicy::FailStop`]
//! the timer halts; under [`TimerPolicy::FailOpen`] it keeps serving restarts.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use thermoguard_timer::prelude::*;
//!
//! let mut timer = PeriodicTimer::new(
//!     "example timer",
//!     Duration::from_millis(10),
//!     TimerPolicy::FailOpen,
//!     || Ok(()),
//! )
//! .expect("valid name");
//!
//! timer.start().expect("thread spawned");
//! assert!(timer.handle().wait_for_fires(1, Duration::from_secs(5)));
//! timer.shutdown();
//! timer.join().expect("timer thread exits");
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod prelude;
pub mod timer;

pub use error::{TimerError, TimerResult, panic_message};
pub use timer::{
    MAX_NAME_LEN, MIN_NAME_LEN, PeriodicTimer, TimerCallback, TimerHandle, TimerPhase, TimerPolicy,
};
