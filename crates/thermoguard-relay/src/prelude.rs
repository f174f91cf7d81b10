//! Prelude for thermoguard-relay.

pub use crate::board::{OUTPUT_REGISTER, RELAY_ADDRESS, RelayBoard, RelayBoardConfig};
pub use crate::bus::{RegisterBus, SimulatedBus};
pub use crate::error::{RelayError, RelayResult};
pub use crate::output::SafetyOutput;
pub use crate::recording::{OutputCommand, OutputHistory, RecordingOutput};
