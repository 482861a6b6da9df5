use async_trait::async_trait;
use proven_beacon_client::{Fork, Node, Slot};

use super::{Observation, settle};
use crate::poller::{ProbeStrategy, Tick};
use crate::results::ProbeOutcome;
use crate::status::{StatusLine, check_epoch_sync, fetch_finality, fetch_head};

/// Waits until every node's head block belongs to `target`.
#[derive(Debug)]
pub struct ForkActivation {
    target: Fork,
    slots_per_epoch: Slot,
}

impl ForkActivation {
    /// Creates the strategy.
    #[must_use]
    pub const fn new(target: Fork, slots_per_epoch: Slot) -> Self {
        Self {
            target,
            slots_per_epoch,
        }
    }

    async fn observe(&self, tick: &Tick, node: &Node) -> Observation<()> {
        let checkpoints = fetch_finality(node).await?;
        let head = fetch_head(node).await?;
        check_epoch_sync(node.index(), tick.clock_slot, head.slot, self.slots_per_epoch)?;

        let message = StatusLine::new()
            .head(tick.clock_slot, &head)
            .exec_payload("exec_payload", head.execution_hash)
            .checkpoints(&checkpoints)
            .finish();
        if head.fork == self.target {
            Ok(ProbeOutcome::done(message, ()))
        } else {
            Ok(ProbeOutcome::reported(message))
        }
    }
}

#[async_trait]
impl ProbeStrategy for ForkActivation {
    type Output = ();

    fn name(&self) -> &'static str {
        "fork"
    }

    async fn probe(&self, tick: &Tick, node: &Node) -> ProbeOutcome<()> {
        settle(self.observe(tick, node).await)
    }
}
