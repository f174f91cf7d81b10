//! # thermoguard-relay
//!
//! The safety output of a thermoguard appliance.
//!
//! This crate provides:
//! - [`SafetyOutput`] trait: the on/off effect driven by supervision
//! - [`RelayBoard`]: four-port relay board behind a [`RegisterBus`]
//! - [`SimulatedBus`] and [`RecordingOutput`] for hardware-free operation
//!
//! ## Example
//!
//! ```rust
//! use thermoguard_relay::prelude::*;
//!
//! let bus = SimulatedBus::new();
//! let mut board = RelayBoard::new(bus.clone()).expect("board reset");
//!
//! board.on().expect("bus write");
//! assert!(board.is_on());
//! assert_eq!(bus.register(RELAY_ADDRESS, OUTPUT_REGISTER), Some(0b0001));
//!
//! board.off().expect("bus write");
//! assert!(!board.is_on());
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

pub mod board;
pub mod bus;
pub mod error;
pub mod output;
pub mod prelude;
pub mod recording;

pub use board::{
    ALL_OUTPUTS, CONFIG_REGISTER, OUTPUT_REGISTER, PORT_COUNT, RELAY_ADDRESS, RelayBoard,
    RelayBoardConfig,
};
pub use bus::{BusWrite, RegisterBus, SimulatedBus};
pub use error::{RelayError, RelayResult};
pub use output::SafetyOutput;
pub use recording::{OutputCommand, OutputHistory, RecordingOutput};
