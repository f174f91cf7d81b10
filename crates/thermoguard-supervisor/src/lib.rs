//! # thermoguard-supervisor
//!
//! Supervisor for a thermoguard appliance.
//!
//! The supervisor wires the pieces of the other thermoguard crates together:
//! - two [`ChannelWorker`]s serving the SERVER and IR channels
//! - a [`HeartbeatMonitor`](thermoguard_watchdog::HeartbeatMonitor) watching
//!   their heartbeat signals
//! - a [`ChannelSelfTest`](thermoguard_watchdog::ChannelSelfTest) probing
//!   every channel once per cycle
//! - a [`SafetyOutput`](thermoguard_relay::SafetyOutput) that stays on only
//!   while [`SupervisorErrors`] is clear
//!
//! ## Example
//!
//! ```rust
//! use thermoguard_relay::RecordingOutput;
//! use thermoguard_supervisor::prelude::*;
//!
//! let output = RecordingOutput::new();
//! let history = output.history();
//! let mut supervisor = Supervisor::builder(SupervisorConfig::default())
//!     .output(output)
//!     .build()
//!     .expect("valid configuration");
//!
//! supervisor.tick();
//! assert!(!supervisor.errors().is_error());
//! assert!(history.is_on());
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

pub mod config;
pub mod error;
pub mod faults;
pub mod handler;
pub mod input;
pub mod prelude;
pub mod supervisor;
pub mod worker;

pub use config::{SupervisorConfig, SupervisorConfigBuilder};
pub use error::{SupervisorError, SupervisorResult};
pub use faults::SupervisorErrors;
pub use handler::{LoggingHandler, MessageHandler, Outbox};
pub use input::{ConsoleInput, QUIT_KEY};
pub use supervisor::{
    Supervisor, SupervisorBuilder, SupervisorState, TEARDOWN_ORDER, TeardownStep, TickOutcome,
};
pub use worker::{ChannelWorker, Worker};
