use async_trait::async_trait;
use proven_beacon_client::{ChainSpec, Node, Root};

use super::{Observation, health_field, settle, status_health};
use crate::poller::{ProbeStrategy, Tick};
use crate::results::{ProbeOutcome, ProbeResultSet};
use crate::status::{StatusLine, fetch_finality, fetch_head};

/// Waits until every node reports the same head block.
///
/// Lagging nodes are not fatal here: the wait exists to let them catch up.
#[derive(Debug)]
pub struct HeadConvergence {
    spec: ChainSpec,
}

impl HeadConvergence {
    /// Creates the strategy.
    #[must_use]
    pub fn new(spec: ChainSpec) -> Self {
        Self { spec }
    }

    async fn observe(&self, tick: &Tick, node: &Node) -> Observation<Root> {
        let checkpoints = fetch_finality(node).await?;
        let head = fetch_head(node).await?;

        let health = status_health(node, &self.spec, head.slot).await;
        let message = StatusLine::new()
            .head(tick.clock_slot, &head)
            .field("health", health_field(health))
            .exec_payload("exec_payload", head.execution_hash)
            .checkpoints(&checkpoints)
            .finish();

        Ok(ProbeOutcome::Reported {
            message,
            value: head.root.non_zero(),
        })
    }
}

#[async_trait]
impl ProbeStrategy for HeadConvergence {
    type Output = Root;

    fn name(&self) -> &'static str {
        "sync"
    }

    async fn probe(&self, tick: &Tick, node: &Node) -> ProbeOutcome<Root> {
        settle(self.observe(tick, node).await)
    }

    /// Every node reported a non-zero head and all heads are equal.
    fn converged(&mut self, _tick: &Tick, results: &ProbeResultSet<Root>) -> Option<Root> {
        let first = *results.values().next()??;
        results
            .values()
            .all(|head| head == Some(&first))
            .then_some(first)
    }
}
