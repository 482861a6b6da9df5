use std::fs::File;
use std::io::Read;
use std::path::Path;

use proven_beacon_client::ChainSpec;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, SLOTS_TOLERANCE, SlotClock};

/// Default budget of consecutive failed probes per node.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Configuration of a [`NetworkMonitor`](crate::NetworkMonitor).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Protocol parameters of the chain.
    pub chain: ChainSpec,

    /// Genesis time in unix seconds.
    pub genesis_time: u64,

    /// Consecutive failed probes after which a node is declared
    /// unresponsive. `0` fails on the first error.
    pub max_consecutive_errors_on_waits: u32,

    /// Slots added to every epoch or slot deadline.
    pub slots_tolerance: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            chain: ChainSpec::default(),
            genesis_time: 0,
            max_consecutive_errors_on_waits: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            slots_tolerance: SLOTS_TOLERANCE,
        }
    }
}

impl MonitorConfig {
    /// Creates a configuration for a chain with genesis at `genesis_time`.
    #[must_use]
    pub fn new(chain: ChainSpec, genesis_time: u64) -> Self {
        Self {
            chain,
            genesis_time,
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The file contains invalid JSON
    /// - The configuration does not validate
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| Error::Config(format!("Failed to open monitor config file: {e}")))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::Config(format!("Failed to read monitor config file: {e}")))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse monitor config file: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Checks that the slot parameters describe a usable clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a slot parameter is zero.
    pub fn validate(&self) -> Result<()> {
        if self.chain.seconds_per_slot == 0 {
            return Err(Error::Config("seconds_per_slot must be positive".to_string()));
        }
        if self.chain.slots_per_epoch == 0 {
            return Err(Error::Config("slots_per_epoch must be positive".to_string()));
        }
        Ok(())
    }

    /// The slot clock described by this configuration.
    #[must_use]
    pub const fn slot_clock(&self) -> SlotClock {
        SlotClock::new(self.genesis_time, &self.chain).with_tolerance(self.slots_tolerance)
    }
}
