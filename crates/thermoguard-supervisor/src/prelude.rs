//! Prelude for thermoguard-supervisor.

pub use crate::config::SupervisorConfig;
pub use crate::error::{SupervisorError, SupervisorResult};
pub use crate::faults::SupervisorErrors;
pub use crate::handler::{MessageHandler, Outbox};
pub use crate::supervisor::{
    Supervisor, SupervisorBuilder, SupervisorState, TEARDOWN_ORDER, TeardownStep, TickOutcome,
};
pub use crate::worker::Worker;
