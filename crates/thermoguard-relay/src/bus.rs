//! Register bus boundary and an in-memory implementation.

use crate::error::{RelayError, RelayResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Byte-wide register access on a two-wire bus.
pub trait RegisterBus: Send {
    /// Write one register of the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Bus`] if the transfer failed.
    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> RelayResult<()>;

    /// Read one register of the device at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Bus`] if the transfer failed.
    fn read_byte(&mut self, address: u8, register: u8) -> RelayResult<u8>;
}

/// One recorded register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusWrite {
    /// Device address.
    pub address: u8,
    /// Register address.
    pub register: u8,
    /// Written value.
    pub value: u8,
}

#[derive(Debug, Default)]
struct BusState {
    registers: BTreeMap<(u8, u8), u8>,
    writes: Vec<BusWrite>,
    faulted: bool,
}

/// In-memory register file.
///
/// Clones share the same registers, so a test can keep a clone to inspect the
/// traffic of a bus moved into a driver.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    state: Arc<Mutex<BusState>>,
}

impl SimulatedBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following transfer fail until cleared.
    pub fn set_faulted(&self, faulted: bool) {
        self.state.lock().faulted = faulted;
    }

    /// Every successful write so far.
    #[must_use]
    pub fn writes(&self) -> Vec<BusWrite> {
        self.state.lock().writes.clone()
    }

    /// Current value of a register, if it was ever written.
    #[must_use]
    pub fn register(&self, address: u8, register: u8) -> Option<u8> {
        self.state.lock().registers.get(&(address, register)).copied()
    }
}

impl RegisterBus for SimulatedBus {
    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> RelayResult<()> {
        let mut state = self.state.lock();
        if state.faulted {
            return Err(RelayError::bus(address, register, "simulated bus fault"));
        }
        state.registers.insert((address, register), value);
        state.writes.push(BusWrite {
            address,
            register,
            value,
        });
        Ok(())
    }

    fn read_byte(&mut self, address: u8, register: u8) -> RelayResult<u8> {
        let state = self.state.lock();
        if state.faulted {
            return Err(RelayError::bus(address, register, "simulated bus fault"));
        }
        Ok(state.registers.get(&(address, register)).copied().unwrap_or(0))
    }
}
