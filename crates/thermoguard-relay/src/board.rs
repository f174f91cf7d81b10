//! Four-port relay board behind an I/O expander.
//!
//! The expander lives at address `0x24`. Register `0x06` configures pin
//! direction (`0x00` = all outputs) and register `0x02` holds the output
//! latch, one bit per port: port `n` is bit `n - 1`.
//!
//! The driver keeps a shadow copy of the output latch and only updates it
//! after the bus accepted the write, so a failed transfer never desynchronizes
//! the shadow from the hardware.

use crate::bus::RegisterBus;
use crate::error::{RelayError, RelayResult};
use crate::output::SafetyOutput;
use serde::{Deserialize, Serialize};

/// Default expander address.
pub const RELAY_ADDRESS: u8 = 0x24;
/// Pin direction register.
pub const CONFIG_REGISTER: u8 = 0x06;
/// Output latch register.
pub const OUTPUT_REGISTER: u8 = 0x02;
/// Pin direction value configuring every pin as an output.
pub const ALL_OUTPUTS: u8 = 0x00;
/// Number of relay ports.
pub const PORT_COUNT: u8 = 4;

/// Relay board settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayBoardConfig {
    /// Expander bus address.
    pub address: u8,
    /// Port driven by the [`SafetyOutput`] implementation.
    pub safety_port: u8,
}

impl Default for RelayBoardConfig {
    fn default() -> Self {
        Self {
            address: RELAY_ADDRESS,
            safety_port: 1,
        }
    }
}

impl RelayBoardConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidConfiguration`] if the safety port is not
    /// a board port.
    pub fn validate(&self) -> RelayResult<()> {
        if port_mask(self.safety_port).is_err() {
            return Err(RelayError::InvalidConfiguration(format!(
                "safety port {} outside 1..={PORT_COUNT}",
                self.safety_port
            )));
        }
        Ok(())
    }
}

fn port_mask(port: u8) -> RelayResult<u8> {
    if (1..=PORT_COUNT).contains(&port) {
        Ok(1u8 << (port - 1))
    } else {
        Err(RelayError::InvalidPort {
            port,
            max: PORT_COUNT,
        })
    }
}

/// Driver for the four-port relay board.
#[derive(Debug)]
pub struct RelayBoard<B: RegisterBus> {
    bus: B,
    config: RelayBoardConfig,
    output: u8,
}

impl<B: RegisterBus> RelayBoard<B> {
    /// Open the board with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`RelayBoard::with_config`].
    pub fn new(bus: B) -> RelayResult<Self> {
        Self::with_config(bus, RelayBoardConfig::default())
    }

    /// Open the board: configure every pin as an output and switch all
    /// ports off.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidConfiguration`] for a bad config and
    /// [`RelayError::Bus`] if the board cannot be reset.
    pub fn with_config(bus: B, config: RelayBoardConfig) -> RelayResult<Self> {
        config.validate()?;
        let mut board = Self {
            bus,
            config,
            output: 0,
        };
        board
            .bus
            .write_byte(config.address, CONFIG_REGISTER, ALL_OUTPUTS)?;
        board.write_output(0)?;
        tracing::info!(address = config.address, safety_port = config.safety_port, "relay board reset");
        Ok(board)
    }

    fn write_output(&mut self, value: u8) -> RelayResult<()> {
        if let Err(e) = self
            .bus
            .write_byte(self.config.address, OUTPUT_REGISTER, value)
        {
            tracing::error!(error = %e, value, "relay output write failed");
            return Err(e);
        }
        tracing::debug!(previous = self.output, value, "relay output written");
        self.output = value;
        Ok(())
    }

    /// Close the relay on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidPort`] or a bus error.
    pub fn port_on(&mut self, port: u8) -> RelayResult<()> {
        let mask = port_mask(port)?;
        self.write_output(self.output | mask)
    }

    /// Open the relay on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidPort`] or a bus error.
    pub fn port_off(&mut self, port: u8) -> RelayResult<()> {
        let mask = port_mask(port)?;
        self.write_output(self.output & !mask)
    }

    /// Flip the relay on `port`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidPort`] or a bus error.
    pub fn toggle(&mut self, port: u8) -> RelayResult<()> {
        let mask = port_mask(port)?;
        self.write_output(self.output ^ mask)
    }

    /// Close every relay.
    ///
    /// # Errors
    ///
    /// Returns a bus error.
    pub fn all_on(&mut self) -> RelayResult<()> {
        self.write_output(u8::MAX >> (8 - PORT_COUNT))
    }

    /// Open every relay.
    ///
    /// # Errors
    ///
    /// Returns a bus error.
    pub fn all_off(&mut self) -> RelayResult<()> {
        self.write_output(0)
    }

    /// Whether the relay on `port` is closed, per the shadow latch.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidPort`].
    pub fn is_port_on(&self, port: u8) -> RelayResult<bool> {
        Ok(self.output & port_mask(port)? != 0)
    }

    /// Read the output latch back from the hardware.
    ///
    /// # Errors
    ///
    /// Returns a bus error.
    pub fn read_output_register(&mut self) -> RelayResult<u8> {
        self.bus.read_byte(self.config.address, OUTPUT_REGISTER)
    }

    /// Shadow copy of the output latch.
    #[must_use]
    pub fn output(&self) -> u8 {
        self.output
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> RelayBoardConfig {
        self.config
    }
}

impl<B: RegisterBus> SafetyOutput for RelayBoard<B> {
    fn on(&mut self) -> RelayResult<()> {
        self.port_on(self.config.safety_port)
    }

    fn off(&mut self) -> RelayResult<()> {
        self.port_off(self.config.safety_port)
    }

    fn is_on(&self) -> bool {
        self.is_port_on(self.config.safety_port).unwrap_or(false)
    }
}
