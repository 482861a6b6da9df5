//! Shared setup for the wait integration tests.
//!
//! Every test runs on a paused tokio clock against a chain whose genesis is
//! an hour in the past, so the wall-clock slot is 300 when a test starts and
//! advances by one per tick.

#![allow(dead_code)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use proven_beacon_client::{ChainSpec, FinalityCheckpoints, Fork, Slot};
use proven_beacon_client_mock::{MockNetwork, block};
use proven_testnet_monitor::{MonitorConfig, NetworkMonitor};
use tokio::time::Instant;

/// Slot of the wall clock when a test starts.
pub const START_SLOT: Slot = 300;

/// Seconds per slot of the default chain.
pub const SLOT_SECS: u64 = 12;

/// Genesis time placing the current slot at [`START_SLOT`].
pub fn past_genesis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
        - START_SLOT * SLOT_SECS
}

/// A network of `count` nodes whose head is at the current slot in `fork`
/// and which has not finalized anything.
pub fn network(count: usize, fork: Fork) -> MockNetwork {
    let network = MockNetwork::new(count);
    network.set_head_everywhere(block(fork, START_SLOT, 1));
    network.set_finality_everywhere(FinalityCheckpoints::default());
    network
}

/// A monitor with the default chain parameters.
pub fn monitor(network: &MockNetwork) -> NetworkMonitor<MockNetwork> {
    monitor_with(network, ChainSpec::default(), 3)
}

/// A monitor with custom chain parameters and error budget.
pub fn monitor_with(
    network: &MockNetwork,
    chain: ChainSpec,
    max_errors: u32,
) -> NetworkMonitor<MockNetwork> {
    let config = MonitorConfig {
        max_consecutive_errors_on_waits: max_errors,
        ..MonitorConfig::new(chain, past_genesis())
    };
    NetworkMonitor::new(config, network.clone()).unwrap()
}

/// Number of whole slots elapsed since `start`.
pub fn ticks_since(start: Instant) -> u64 {
    start.elapsed().as_secs() / SLOT_SECS
}

/// Duration of `slots` slots.
pub const fn slots(slots: u64) -> Duration {
    Duration::from_secs(slots * SLOT_SECS)
}
