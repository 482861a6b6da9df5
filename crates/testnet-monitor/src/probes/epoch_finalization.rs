use async_trait::async_trait;
use proven_beacon_client::{Checkpoint, Epoch, Node, Slot};
use tracing::info;

use super::{Observation, settle};
use crate::poller::{ProbeStrategy, Tick};
use crate::results::{ProbeOutcome, ProbeResultSet};
use crate::status::{StatusLine, check_epoch_sync, fetch_finality, fetch_head};

/// Waits until every node finalized `target` or a later epoch.
#[derive(Debug)]
pub struct EpochFinalization {
    target: Epoch,
    slots_per_epoch: Slot,
}

impl EpochFinalization {
    /// Creates the strategy. `target` is normally the epoch current when
    /// the wait starts.
    #[must_use]
    pub const fn new(target: Epoch, slots_per_epoch: Slot) -> Self {
        Self {
            target,
            slots_per_epoch,
        }
    }

    /// The epoch the wait expects to see finalized.
    #[must_use]
    pub const fn target(&self) -> Epoch {
        self.target
    }

    async fn observe(&self, tick: &Tick, node: &Node) -> Observation<Checkpoint> {
        let head = fetch_head(node).await?;
        check_epoch_sync(node.index(), tick.clock_slot, head.slot, self.slots_per_epoch)?;
        let checkpoints = fetch_finality(node).await?;

        let message = StatusLine::new()
            .head(tick.clock_slot, &head)
            .checkpoints(&checkpoints)
            .field("epoch_to_finalize", self.target)
            .finish();

        Ok(match checkpoints.finalized {
            Some(finalized) if finalized.epoch >= self.target => {
                ProbeOutcome::done(message, finalized)
            }
            _ => ProbeOutcome::reported(message),
        })
    }
}

#[async_trait]
impl ProbeStrategy for EpochFinalization {
    type Output = Checkpoint;

    fn name(&self) -> &'static str {
        "epoch finalization"
    }

    async fn probe(&self, tick: &Tick, node: &Node) -> ProbeOutcome<Checkpoint> {
        settle(self.observe(tick, node).await)
    }

    fn converged(
        &mut self,
        _tick: &Tick,
        results: &ProbeResultSet<Checkpoint>,
    ) -> Option<Checkpoint> {
        if !results.all_done() {
            return None;
        }
        let checkpoint = results.value(0).copied()?;
        info!("Epoch {} finalized", self.target);
        Some(checkpoint)
    }
}
