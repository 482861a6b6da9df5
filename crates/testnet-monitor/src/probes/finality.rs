use async_trait::async_trait;
use proven_beacon_client::{ChainSpec, Checkpoint, Node};

use super::{Observation, health_field, settle, status_health};
use crate::poller::{ProbeStrategy, Tick};
use crate::results::ProbeOutcome;
use crate::status::{StatusLine, check_epoch_sync, fetch_finality, fetch_head};

/// Waits until every node reports a finalized checkpoint. Converges on the
/// first node's checkpoint.
#[derive(Debug)]
pub struct Finality {
    spec: ChainSpec,
}

impl Finality {
    /// Creates the strategy.
    #[must_use]
    pub fn new(spec: ChainSpec) -> Self {
        Self { spec }
    }

    async fn observe(&self, tick: &Tick, node: &Node) -> Observation<Checkpoint> {
        let checkpoints = fetch_finality(node).await?;
        let head = fetch_head(node).await?;
        check_epoch_sync(
            node.index(),
            tick.clock_slot,
            head.slot,
            self.spec.slots_per_epoch,
        )?;

        let health = status_health(node, &self.spec, head.slot).await;
        let message = StatusLine::new()
            .head(tick.clock_slot, &head)
            .field("health", health_field(health))
            .exec_payload("exec_payload", head.execution_hash)
            .checkpoints(&checkpoints)
            .finish();

        Ok(match checkpoints.finalized {
            Some(finalized) => ProbeOutcome::done(message, finalized),
            None => ProbeOutcome::reported(message),
        })
    }
}

#[async_trait]
impl ProbeStrategy for Finality {
    type Output = Checkpoint;

    fn name(&self) -> &'static str {
        "finality"
    }

    async fn probe(&self, tick: &Tick, node: &Node) -> ProbeOutcome<Checkpoint> {
        settle(self.observe(tick, node).await)
    }
}
