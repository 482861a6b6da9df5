use proven_beacon_client::{Fork, Slot};
use thiserror::Error;

/// The result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a wait.
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The wait context was cancelled.
    #[error("wait cancelled")]
    Cancelled,

    /// The wait context ran past its deadline.
    #[error("wait deadline exceeded")]
    DeadlineExceeded,

    /// A node fell further behind the wall clock than allowed.
    #[error(
        "node {node}: missed more slots than allowed (max={max_missed}): clock_slot={clock_slot}, slot={slot}"
    )]
    MissedSlots {
        /// Index of the node.
        node: usize,
        /// Allowed lag in slots.
        max_missed: Slot,
        /// Slot according to the wall clock.
        clock_slot: Slot,
        /// Slot of the node's head.
        slot: Slot,
    },

    /// A node failed to keep up for an entire epoch.
    #[error("node {node}: unable to sync for an entire epoch: clock_slot={clock_slot}, slot={slot}")]
    EpochNotSynced {
        /// Index of the node.
        node: usize,
        /// Slot according to the wall clock.
        clock_slot: Slot,
        /// Slot of the node's head.
        slot: Slot,
    },

    /// A node exhausted its budget of consecutive failed probes.
    #[error("node {node} unresponsive after {errors} consecutive errors: {last}")]
    NodeUnresponsive {
        /// Index of the node.
        node: usize,
        /// Number of consecutive failed probes.
        errors: u32,
        /// The last probe error.
        last: String,
    },

    /// A wait needs an execution client the node does not have.
    #[error("node {0} has no execution client")]
    MissingExecutionClient(usize),

    /// Health scoring met a state without a participation registry that is
    /// not a phase0 state.
    #[error("cannot calculate participation for {0} state")]
    UnsupportedState(Fork),

    /// Health scoring has no active validators or no expected reward.
    #[error("not enough active validators to score health")]
    InsufficientValidators,

    /// A query failed outside of a probe.
    #[error(transparent)]
    Client(#[from] proven_beacon_client::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
