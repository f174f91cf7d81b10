//! Prelude for thermoguard-watchdog.

pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::heartbeat::{HeartbeatMonitor, HeartbeatReport};
pub use crate::self_test::{ChannelSelfTest, QueueTestRecord, SelfTestFailure, SelfTestTarget};
