//! The slot-synchronized polling loop shared by every wait.

use async_trait::async_trait;
use futures::future::join_all;
use proven_beacon_client::{Epoch, Node, Slot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::results::{ProbeOutcome, ProbeResultSet};
use crate::{Result, SlotClock, WaitContext, WallClock};

/// One iteration of the polling loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tick {
    /// Slot according to the wall clock.
    pub clock_slot: Slot,

    /// Epoch of `clock_slot`.
    pub epoch: Epoch,

    /// 1-based count of ticks since genesis within this wait.
    pub number: u64,
}

/// A convergence goal plugged into the [`ConvergencePoller`].
///
/// `probe` runs once per node per tick, concurrently across nodes, and must
/// not depend on what other nodes observe in the same tick. Cross-node
/// decisions belong in `converged`, which runs after every probe of the tick
/// has returned.
#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    /// The value a converged wait returns.
    type Output: Clone + Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Gate evaluated before each tick's probes; `false` skips the tick.
    async fn ready(&mut self, _tick: &Tick) -> bool {
        true
    }

    /// Observes one node.
    async fn probe(&self, tick: &Tick, node: &Node) -> ProbeOutcome<Self::Output>;

    /// Decides whether the network converged this tick.
    fn converged(
        &mut self,
        _tick: &Tick,
        results: &ProbeResultSet<Self::Output>,
    ) -> Option<Self::Output> {
        if results.all_done() {
            results.value(0).cloned()
        } else {
            None
        }
    }
}

/// Drives a [`ProbeStrategy`] across a node set, one batch of probes per
/// slot, until it converges, a fatal condition is reported, or the wait
/// context ends.
#[derive(Clone, Copy, Debug)]
pub struct ConvergencePoller {
    clock: SlotClock,
    wall: WallClock,
    max_consecutive_errors: u32,
}

impl ConvergencePoller {
    /// Creates a new poller.
    #[must_use]
    pub const fn new(clock: SlotClock, wall: WallClock, max_consecutive_errors: u32) -> Self {
        Self {
            clock,
            wall,
            max_consecutive_errors,
        }
    }

    /// Runs `strategy` against `nodes` until it converges.
    ///
    /// The first tick fires one slot after the call. Ticks before the end of
    /// the genesis slot are skipped.
    ///
    /// # Errors
    ///
    /// Returns the context's error once it ends, or the first fatal error
    /// raised by a probe or by the error budget.
    pub async fn run<S: ProbeStrategy>(
        &self,
        ctx: &WaitContext,
        nodes: &[Node],
        mut strategy: S,
    ) -> Result<S::Output> {
        let period = self.clock.slot_duration();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut results = ProbeResultSet::new(nodes.len(), self.max_consecutive_errors);
        let polling_start = self.clock.genesis() + period;
        let mut number = 0;

        debug!(
            "{}: polling {} nodes every {}s",
            strategy.name(),
            nodes.len(),
            period.as_secs()
        );

        loop {
            tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                _ = ticker.tick() => {}
            }

            let now = self.wall.now();
            if now < polling_start {
                let remaining = polling_start.duration_since(now).unwrap_or_default();
                info!("Time till genesis: {}s", remaining.as_secs());
                continue;
            }

            number += 1;
            let clock_slot = self.clock.slot_at(now);
            let tick = Tick {
                clock_slot,
                epoch: self.clock.epoch_at(clock_slot),
                number,
            };

            let ready = tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                ready = strategy.ready(&tick) => ready,
            };
            if !ready {
                continue;
            }

            results.clear();
            let batch = join_all(nodes.iter().map(|node| strategy.probe(&tick, node)));
            let outcomes = tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                outcomes = batch => outcomes,
            };
            for (index, outcome) in outcomes.into_iter().enumerate() {
                results.record(index, outcome);
            }

            results.check_error()?;
            results.print_messages(|line| info!("{line}"));

            if let Some(value) = strategy.converged(&tick, &results) {
                debug!("{}: converged at slot {clock_slot}", strategy.name());
                return Ok(value);
            }
        }
    }
}
