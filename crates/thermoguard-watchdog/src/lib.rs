//! # thermoguard-watchdog
//!
//! Liveness and connectivity checks for thermoguard workers.
//!
//! This crate provides:
//! - [`HeartbeatMonitor`]: debounced checks that every worker loop is alive
//! - [`ChannelSelfTest`]: per-cycle probes proving every channel round-trips
//!
//! Both are driven from the supervisor tick and never block: heartbeats are
//! consumed with a zero-timeout wait and probes are non-blocking puts.
//!
//! ## Example
//!
//! ```rust
//! use thermoguard_ipc::Signal;
//! use thermoguard_watchdog::prelude::*;
//!
//! let heartbeat = Signal::new("server heartbeat");
//! let mut monitor = HeartbeatMonitor::new(5);
//! monitor.add_worker("server", heartbeat.clone()).expect("unique name");
//!
//! heartbeat.set();
//! assert!(monitor.run(3).is_none());
//! let report = monitor.run(6).expect("window elapsed");
//! assert!(report.is_healthy());
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
pub mod heartbeat;
pub mod prelude;
pub mod self_test;

pub use error::{WatchdogError, WatchdogResult};
pub use heartbeat::{DEFAULT_DEBOUNCE_TICKS, HeartbeatMonitor, HeartbeatReport};
pub use self_test::{
    ChannelSelfTest, DEFAULT_SELF_TEST_INTERVAL, QueueTestRecord, SelfTestFailure, SelfTestTarget,
};
