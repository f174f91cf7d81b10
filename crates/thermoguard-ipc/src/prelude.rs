//! Prelude for thermoguard-ipc.
//!
//! Re-exports the types most components need.

pub use crate::channel::{Channel, ChannelReader, ChannelStats, ChannelWriter};
pub use crate::error::{ChannelError, ChannelResult, PutError, PutErrorKind};
pub use crate::message::{
    BackendReply, BackendRequest, EventKind, Member, Message, MessageHeader, SelfTestEvent,
};
pub use crate::routing::SystemChannels;
pub use crate::signal::{Signal, WorkerSignals};
