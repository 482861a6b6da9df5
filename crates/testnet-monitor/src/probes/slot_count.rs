use async_trait::async_trait;
use proven_beacon_client::{Node, Slot};

use super::{Observation, settle};
use crate::poller::{ProbeStrategy, Tick};
use crate::results::{ProbeOutcome, ProbeResultSet};
use crate::status::{StatusLine, check_missed_slots, fetch_finality, fetch_head};

/// Lets a number of slots pass while every node keeps within `max_missed`
/// slots of the clock.
#[derive(Debug)]
pub struct SlotCount {
    slots: Slot,
    max_missed: Slot,
    passed: Slot,
}

impl SlotCount {
    /// Waits `slots` polled slots.
    #[must_use]
    pub const fn new(slots: Slot, max_missed: Slot) -> Self {
        Self {
            slots,
            max_missed,
            passed: 0,
        }
    }

    async fn observe(&self, tick: &Tick, node: &Node) -> Observation<()> {
        let checkpoints = fetch_finality(node).await?;
        let head = fetch_head(node).await?;
        check_missed_slots(node.index(), tick.clock_slot, head.slot, self.max_missed)?;

        let message = StatusLine::new()
            .head(tick.clock_slot, &head)
            .exec_payload("exec_payload", head.execution_hash)
            .checkpoints(&checkpoints)
            .finish();
        Ok(ProbeOutcome::reported(message))
    }
}

#[async_trait]
impl ProbeStrategy for SlotCount {
    type Output = ();

    fn name(&self) -> &'static str {
        "slots"
    }

    async fn probe(&self, tick: &Tick, node: &Node) -> ProbeOutcome<()> {
        settle(self.observe(tick, node).await)
    }

    fn converged(&mut self, _tick: &Tick, _results: &ProbeResultSet<()>) -> Option<()> {
        self.passed += 1;
        (self.passed >= self.slots).then_some(())
    }
}
