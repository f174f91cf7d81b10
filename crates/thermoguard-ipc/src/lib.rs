//! # thermoguard-ipc
//!
//! Coordination primitives shared by every thermoguard component.
//!
//! This crate provides:
//! - [`Signal`]: shared boolean flag with consume-on-wait semantics
//! - [`Channel`]: bounded, non-blocking FIFO of [`Message`]s
//! - The message protocol: [`Member`], [`EventKind`], [`MessageHeader`]
//! - [`SystemChannels`]: the routing table from members to channels
//!
//! ## Guarantees
//!
//! - `put` and `get` never block
//! - FIFO order within one channel
//! - A channel never holds more than its capacity
//! - Close happens exactly once per channel
//!
//! ## Example
//!
//! ```rust
//! use thermoguard_ipc::prelude::*;
//!
//! let channels = SystemChannels::new(128).expect("valid capacity");
//! let probe = Message::probe(Member::Server).expect("server takes probes");
//! channels.deliver(probe).expect("channel has room");
//!
//! let received = channels.server.get().expect("channel open");
//! assert!(received.is_some_and(|m| m.is_self_test()));
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

pub mod channel;
pub mod error;
pub mod message;
pub mod prelude;
pub mod routing;
pub mod signal;

pub use channel::{Channel, ChannelReader, ChannelStats, ChannelWriter, DEFAULT_CHANNEL_CAPACITY};
pub use error::{ChannelError, ChannelResult, PutError, PutErrorKind};
pub use message::{
    BackendReply, BackendRequest, EventKind, Member, Message, MessageHeader, Payload,
    SelfTestEvent,
};
pub use routing::SystemChannels;
pub use signal::{Signal, WorkerSignals};
