use futures::future::join_all;
use proven_beacon_client::{Checkpoint, ExecutionHash, Fork, Node, NodeProvider, Root, Slot};
use tracing::{info, warn};

use crate::poller::{ConvergencePoller, ProbeStrategy};
use crate::probes::{
    EpochFinalization, ExecutionFinality, Finality, ForkActivation, HeadConvergence,
    PayloadAvailability, SlotCount, health_field, status_health,
};
use crate::results::ProbeError;
use crate::status::{StatusLine, fetch_finality, fetch_head};
use crate::{MonitorConfig, Result, SlotClock, WaitContext, WallClock};

/// Watches a running testnet and blocks until it reaches a target state.
///
/// Every wait polls the nodes running when the wait starts, once per slot.
#[derive(Debug)]
pub struct NetworkMonitor<P> {
    config: MonitorConfig,
    clock: SlotClock,
    wall: WallClock,
    provider: P,
}

impl<P: NodeProvider> NetworkMonitor<P> {
    /// Creates a monitor over the nodes supplied by `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration
    /// does not validate.
    pub fn new(config: MonitorConfig, provider: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            clock: config.slot_clock(),
            wall: WallClock::new(),
            config,
            provider,
        })
    }

    /// The slot clock, for building deadlines around waits.
    #[must_use]
    pub const fn spec_clock(&self) -> &SlotClock {
        &self.clock
    }

    /// Genesis time in unix seconds.
    #[must_use]
    pub const fn genesis_time(&self) -> u64 {
        self.config.genesis_time
    }

    /// Sleeps until genesis, or until `ctx` ends.
    pub async fn wait_for_genesis(&self, ctx: &WaitContext) {
        let genesis = self.wall.instant_at(self.clock.genesis());
        tokio::select! {
            _ = ctx.done() => {}
            () = tokio::time::sleep_until(genesis) => {}
        }
    }

    /// Waits `slots` slots, logging the status of every running node once
    /// per slot.
    ///
    /// # Errors
    ///
    /// Returns the context's error if it ends first.
    pub async fn wait_slots(&self, ctx: &WaitContext, slots: Slot) -> Result<()> {
        for _ in 0..slots {
            self.print_status(ctx).await;
            tokio::select! {
                err = ctx.done() => return Err(err),
                () = tokio::time::sleep(self.clock.slot_duration()) => {}
            }
        }
        Ok(())
    }

    /// Waits `slots` polled slots, failing if any node falls `max_missed`
    /// slots behind the clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissedSlots`](crate::Error::MissedSlots) for a
    /// lagging node, or any error that ends a wait.
    pub async fn wait_slots_with_max_missed_slots(
        &self,
        ctx: &WaitContext,
        slots: Slot,
        max_missed: Slot,
    ) -> Result<()> {
        self.run(ctx, SlotCount::new(slots, max_missed)).await
    }

    /// Waits until every node's head belongs to `fork`.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the wait.
    pub async fn wait_for_fork(&self, ctx: &WaitContext, fork: Fork) -> Result<()> {
        info!("Waiting for fork {fork}");
        self.run(ctx, ForkActivation::new(fork, self.config.chain.slots_per_epoch))
            .await
    }

    /// Waits until every node reports a finalized checkpoint and returns
    /// the first node's.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the wait.
    pub async fn wait_for_finality(&self, ctx: &WaitContext) -> Result<Checkpoint> {
        self.run(ctx, Finality::new(self.config.chain.clone())).await
    }

    /// Waits until every node reports the same head and returns it.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the wait.
    pub async fn wait_for_sync(&self, ctx: &WaitContext) -> Result<Root> {
        self.run(ctx, HeadConvergence::new(self.config.chain.clone()))
            .await
    }

    /// Waits until every node's finalized block carries an execution
    /// payload.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the wait.
    pub async fn wait_for_execution_finality(&self, ctx: &WaitContext) -> Result<Checkpoint> {
        self.run(ctx, ExecutionFinality::new(self.config.chain.slots_per_epoch))
            .await
    }

    /// Waits until every node finalized the epoch that is current when the
    /// call is made.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the wait.
    pub async fn wait_for_current_epoch_finalization(
        &self,
        ctx: &WaitContext,
    ) -> Result<Checkpoint> {
        let epoch = self.clock.epoch_at(self.clock.slot_at(self.wall.now()));
        info!("Waiting for epoch {epoch} to be finalized");
        self.run(
            ctx,
            EpochFinalization::new(epoch, self.config.chain.slots_per_epoch),
        )
        .await
    }

    /// Waits until every node's head carries an execution payload and
    /// returns the first node's payload hash.
    ///
    /// Before the terminal total difficulty is reached, slots are skipped
    /// without probing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingExecutionClient`](crate::Error::MissingExecutionClient)
    /// if the first running node cannot be asked for the total difficulty,
    /// or the error that ended the wait.
    pub async fn wait_for_execution_payload(&self, ctx: &WaitContext) -> Result<ExecutionHash> {
        let nodes = self.provider.running_nodes();
        let strategy = PayloadAvailability::new(self.config.chain.clone(), nodes.first())?;
        self.poller().run(ctx, &nodes, strategy).await
    }

    /// Logs one status line per running node. Failed queries are logged
    /// and skipped.
    pub async fn print_status(&self, ctx: &WaitContext) {
        let nodes = self.provider.running_nodes();
        let clock_slot = self.clock.slot_at(self.wall.now());
        let lines = join_all(nodes.iter().map(|node| self.node_status(node, clock_slot)));
        tokio::select! {
            biased;
            _ = ctx.done() => {}
            lines = lines => {
                for (node, line) in nodes.iter().zip(lines) {
                    match line {
                        Ok(line) => info!("{node}: {line}"),
                        Err(e) => warn!("{node}: {e}"),
                    }
                }
            }
        }
    }

    async fn node_status(
        &self,
        node: &Node,
        clock_slot: Slot,
    ) -> std::result::Result<String, ProbeError> {
        let head = fetch_head(node).await?;
        let checkpoints = fetch_finality(node).await?;
        let health = status_health(node, &self.config.chain, head.slot).await;
        Ok(StatusLine::new()
            .head(clock_slot, &head)
            .field("health", health_field(health))
            .exec_payload("exec_payload", head.execution_hash)
            .checkpoints(&checkpoints)
            .finish())
    }

    fn poller(&self) -> ConvergencePoller {
        ConvergencePoller::new(
            self.clock,
            self.wall,
            self.config.max_consecutive_errors_on_waits,
        )
    }

    async fn run<S: ProbeStrategy>(&self, ctx: &WaitContext, strategy: S) -> Result<S::Output> {
        let nodes = self.provider.running_nodes();
        self.poller().run(ctx, &nodes, strategy).await
    }
}
