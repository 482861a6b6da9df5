use std::fmt::Debug;

use async_trait::async_trait;
use num_bigint::BigUint;

use crate::{
    BeaconState, BlockId, BlockNumber, FinalityCheckpoints, Result, StateId, ValidatorBalance,
    ValidatorIndex, VersionedBlock,
};

/// Query capability of a beacon (consensus) node.
///
/// Implementations must be cancel-safe: callers abort a query by dropping
/// its future.
#[async_trait]
pub trait ConsensusClient: Debug + Send + Sync + 'static {
    /// Fetch a block summary.
    async fn head_block(&self, block: BlockId) -> Result<VersionedBlock>;

    /// Fetch the finality checkpoints of a state.
    async fn finality_checkpoints(&self, state: StateId) -> Result<FinalityCheckpoints>;

    /// Fetch a full state.
    async fn state(&self, state: StateId) -> Result<BeaconState>;

    /// Fetch balances of the given validators at a state.
    async fn validator_balances(
        &self,
        state: StateId,
        ids: &[ValidatorIndex],
    ) -> Result<Vec<ValidatorBalance>>;
}

/// Query capability of an execution node.
#[async_trait]
pub trait ExecutionClient: Debug + Send + Sync + 'static {
    /// Total accumulated proof-of-work difficulty up to a block.
    async fn total_difficulty(&self, block: BlockNumber) -> Result<BigUint>;
}
