//! Convergence detection and health scoring for consensus testnets.
//!
//! A [`NetworkMonitor`] polls every running node once per slot and blocks
//! until the network as a whole reaches a target state: a fork, finality,
//! a common head, an execution payload. Per-node query failures are
//! tolerated up to a budget; a node that falls an epoch behind, or
//! exhausts its budget, aborts the wait.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod clock;
mod config;
mod context;
mod error;
mod health;
mod monitor;
mod poller;
mod probes;
mod results;
mod status;

pub use clock::{SLOTS_TOLERANCE, SlotClock, WallClock};
pub use config::{DEFAULT_MAX_CONSECUTIVE_ERRORS, MonitorConfig};
pub use context::WaitContext;
pub use error::{Error, Result};
pub use health::compute_health;
pub use monitor::NetworkMonitor;
pub use poller::{ConvergencePoller, ProbeStrategy, Tick};
pub use probes::{
    EpochFinalization, ExecutionFinality, Finality, ForkActivation, HeadConvergence,
    PayloadAvailability, SlotCount,
};
pub use results::{ProbeError, ProbeOutcome, ProbeResultSet};
pub use status::shorten;
