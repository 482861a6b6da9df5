use async_trait::async_trait;
use num_bigint::BigUint;
use proven_beacon_client::{BlockNumber, ChainSpec, ExecutionHash, Node};
use tracing::{debug, info, warn};

use super::{Observation, health_field, settle, status_health};
use crate::poller::{ProbeStrategy, Tick};
use crate::results::ProbeOutcome;
use crate::status::{StatusLine, check_epoch_sync, fetch_head};
use crate::{Error, Result};

/// Waits until every node's head block carries an execution payload.
///
/// While the chain has a terminal total difficulty still ahead of it, ticks
/// are skipped until the gate node's execution client reports reaching it.
#[derive(Debug)]
pub struct PayloadAvailability {
    spec: ChainSpec,
    gate: Option<(Node, BigUint)>,
}

impl PayloadAvailability {
    /// Creates the strategy, gating on `gate_node`'s execution client when
    /// the chain has a terminal total difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingExecutionClient`] if the gate is needed and
    /// there is no gate node or it has no execution client.
    pub fn new(spec: ChainSpec, gate_node: Option<&Node>) -> Result<Self> {
        let gate = match &spec.terminal_total_difficulty {
            Some(ttd) => match gate_node {
                Some(node) if node.execution().is_some() => Some((node.clone(), ttd.clone())),
                Some(node) => return Err(Error::MissingExecutionClient(node.index())),
                None => return Err(Error::MissingExecutionClient(0)),
            },
            None => None,
        };
        Ok(Self { spec, gate })
    }

    async fn observe(&self, tick: &Tick, node: &Node) -> Observation<ExecutionHash> {
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
            .finish();

        Ok(match head.execution_hash {
            Some(hash) => ProbeOutcome::done(message, hash),
            None => ProbeOutcome::reported(message),
        })
    }
}

#[async_trait]
impl ProbeStrategy for PayloadAvailability {
    type Output = ExecutionHash;

    fn name(&self) -> &'static str {
        "execution payload"
    }

    async fn ready(&mut self, _tick: &Tick) -> bool {
        let Some((node, ttd)) = &self.gate else {
            return true;
        };
        let Some(execution) = node.execution() else {
            return true;
        };
        match execution.total_difficulty(BlockNumber::Latest).await {
            Ok(td) if td >= *ttd => info!("Terminal total difficulty reached: {td}"),
            Ok(td) => {
                debug!("Total difficulty {td} below terminal {ttd}");
                return false;
            }
            Err(e) => {
                warn!("Error querying {node} for total difficulty: {e}");
                return true;
            }
        }
        self.gate = None;
        true
    }

    async fn probe(&self, tick: &Tick, node: &Node) -> ProbeOutcome<ExecutionHash> {
        settle(self.observe(tick, node).await)
    }
}
