//! Supervisor configuration.

use crate::error::{SupervisorError, SupervisorResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thermoguard_relay::RelayBoardConfig;

/// Supervisor settings.
///
/// Every field has a default, so a config file only needs the fields it
/// changes. Keys are snake_case; camelCase spellings are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Capacity of each message channel.
    #[serde(alias = "channelCapacity")]
    pub channel_capacity: usize,

    /// Ticks that must pass between two heartbeat checks.
    #[serde(alias = "heartbeatDebounceTicks")]
    pub heartbeat_debounce_ticks: u64,

    /// Length of one channel self-test cycle.
    #[serde(alias = "selfTestIntervalSeconds")]
    pub self_test_interval_seconds: u64,

    /// Period of the heartbeat check timer.
    #[serde(alias = "heartbeatIntervalSeconds")]
    pub heartbeat_interval_seconds: u64,

    /// Sleep between two supervisor loop iterations.
    #[serde(alias = "tickIntervalMs")]
    pub tick_interval_ms: u64,

    /// Maximum MAIN-channel messages handled per tick.
    #[serde(alias = "inboundBatchSize")]
    pub inbound_batch_size: usize,

    /// How long a worker waits for shutdown between two inbox polls.
    #[serde(alias = "workerPollIntervalMs")]
    pub worker_poll_interval_ms: u64,

    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(alias = "logFilter")]
    pub log_filter: String,

    /// Relay board driving the safety output.
    pub relay: RelayBoardConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 128,
            heartbeat_debounce_ticks: 5,
            self_test_interval_seconds: 10,
            heartbeat_interval_seconds: 3,
            tick_interval_ms: 1000,
            inbound_batch_size: 32,
            worker_poll_interval_ms: 100,
            log_filter: "info".to_owned(),
            relay: RelayBoardConfig::default(),
        }
    }
}

impl SupervisorConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any count or interval is zero or the relay
    /// configuration is invalid.
    pub fn validate(&self) -> SupervisorResult<()> {
        let positive = [
            ("channel_capacity", u64::try_from(self.channel_capacity).unwrap_or(u64::MAX)),
            ("heartbeat_debounce_ticks", self.heartbeat_debounce_ticks),
            ("self_test_interval_seconds", self.self_test_interval_seconds),
            ("heartbeat_interval_seconds", self.heartbeat_interval_seconds),
            ("tick_interval_ms", self.tick_interval_ms),
            ("inbound_batch_size", u64::try_from(self.inbound_batch_size).unwrap_or(u64::MAX)),
            ("worker_poll_interval_ms", self.worker_poll_interval_ms),
        ];
        if let Some((field, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(SupervisorError::invalid_configuration(format!(
                "{field} must be greater than 0"
            )));
        }
        self.relay
            .validate()
            .map_err(|e| SupervisorError::invalid_configuration(e.to_string()))
    }

    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from_path(path: impl AsRef<Path>) -> SupervisorResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SupervisorError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&content).map_err(|source| SupervisorError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded supervisor config");
        Ok(config)
    }

    /// Self-test cycle length.
    #[must_use]
    pub fn self_test_interval(&self) -> Duration {
        Duration::from_secs(self.self_test_interval_seconds)
    }

    /// Heartbeat check timer period.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Loop sleep.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Worker inbox poll period.
    #[must_use]
    pub fn worker_poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }
}

/// Builder for [`SupervisorConfig`].
#[derive(Debug, Default)]
pub struct SupervisorConfigBuilder {
    config: SupervisorConfig,
}

impl SupervisorConfigBuilder {
    /// Set the channel capacity.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Set the heartbeat debounce window in ticks.
    #[must_use]
    pub fn heartbeat_debounce_ticks(mut self, ticks: u64) -> Self {
        self.config.heartbeat_debounce_ticks = ticks;
        self
    }

    /// Set the self-test cycle length in seconds.
    #[must_use]
    pub fn self_test_interval_seconds(mut self, seconds: u64) -> Self {
        self.config.self_test_interval_seconds = seconds;
        self
    }

    /// Set the heartbeat timer period in seconds.
    #[must_use]
    pub fn heartbeat_interval_seconds(mut self, seconds: u64) -> Self {
        self.config.heartbeat_interval_seconds = seconds;
        self
    }

    /// Set the loop sleep in milliseconds.
    #[must_use]
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    /// Set the inbound batch size.
    #[must_use]
    pub fn inbound_batch_size(mut self, size: usize) -> Self {
        self.config.inbound_batch_size = size;
        self
    }

    /// Set the worker poll period in milliseconds.
    #[must_use]
    pub fn worker_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.worker_poll_interval_ms = ms;
        self
    }

    /// Set the default log filter.
    #[must_use]
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    /// Set the relay board configuration.
    #[must_use]
    pub fn relay(mut self, relay: RelayBoardConfig) -> Self {
        self.config.relay = relay;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> SupervisorResult<SupervisorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
