//! Abstract query interface for the beacon and execution nodes of a testnet.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod error;
mod node;
mod spec;
mod types;

pub use client::{ConsensusClient, ExecutionClient};
pub use error::{Error, Result};
pub use node::{Node, NodeProvider};
pub use spec::{BASE_REWARDS_PER_EPOCH, ChainSpec, MAX_PARTICIPATION_SCORE};
pub use types::*;
