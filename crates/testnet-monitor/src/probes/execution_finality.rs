use async_trait::async_trait;
use proven_beacon_client::{BlockId, Checkpoint, Node, Slot};

use super::{Observation, settle};
use crate::poller::{ProbeStrategy, Tick};
use crate::results::{ProbeError, ProbeOutcome};
use crate::status::{Short, StatusLine, check_epoch_sync, fetch_finality, fetch_head};

/// Waits until every node's finalized block carries an execution payload.
#[derive(Debug)]
pub struct ExecutionFinality {
    slots_per_epoch: Slot,
}

impl ExecutionFinality {
    /// Creates the strategy.
    #[must_use]
    pub const fn new(slots_per_epoch: Slot) -> Self {
        Self { slots_per_epoch }
    }

    async fn observe(&self, tick: &Tick, node: &Node) -> Observation<Checkpoint> {
        let head = fetch_head(node).await?;
        check_epoch_sync(node.index(), tick.clock_slot, head.slot, self.slots_per_epoch)?;
        let checkpoints = fetch_finality(node).await?;

        let finalized_block = match checkpoints.finalized {
            Some(finalized) => Some(
                node.consensus()
                    .head_block(BlockId::Root(finalized.root))
                    .await
                    .map_err(|e| ProbeError::new("failed to retrieve block", e))?,
            ),
            None => None,
        };
        let finalized_exec = finalized_block.and_then(|b| b.execution_hash);

        let message = StatusLine::new()
            .field("fork", head.fork)
            .field("finalized_fork", Short(finalized_block.map(|b| b.fork)))
            .field("clock_slot", tick.clock_slot)
            .field("slot", head.slot)
            .field("head", Short(Some(head.root)))
            .exec_payload("exec_payload", head.execution_hash)
            .exec_payload("finalized_exec_payload", finalized_exec)
            .checkpoints(&checkpoints)
            .finish();

        Ok(match (checkpoints.finalized, finalized_exec) {
            (Some(finalized), Some(_)) => ProbeOutcome::done(message, finalized),
            _ => ProbeOutcome::reported(message),
        })
    }
}

#[async_trait]
impl ProbeStrategy for ExecutionFinality {
    type Output = Checkpoint;

    fn name(&self) -> &'static str {
        "execution finality"
    }

    async fn probe(&self, tick: &Tick, node: &Node) -> ProbeOutcome<Checkpoint> {
        settle(self.observe(tick, node).await)
    }
}
