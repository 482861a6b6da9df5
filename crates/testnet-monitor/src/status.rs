//! Status-line formatting and the queries every probe starts with.

use std::fmt::{self, Display};

use proven_beacon_client::{
    BlockId, Checkpoint, ExecutionHash, FinalityCheckpoints, Node, Slot, StateId, VersionedBlock,
};

use crate::Error;
use crate::results::ProbeError;

/// Shortens a long hex identifier to its first six and last four
/// characters.
#[must_use]
pub fn shorten(s: &str) -> String {
    if s.len() <= 12 || !s.is_ascii() {
        return s.to_string();
    }
    format!("{}..{}", &s[..6], &s[s.len() - 4..])
}

/// Displays an optional identifier shortened, or `none`.
pub(crate) struct Short<T>(pub Option<T>);

impl<T: Display> Display for Short<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => f.write_str(&shorten(&v.to_string())),
            None => f.write_str("none"),
        }
    }
}

/// Displays an optional checkpoint as `epoch:root` with the root shortened.
pub(crate) struct ShortCheckpoint(pub Option<Checkpoint>);

impl Display for ShortCheckpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(c) => write!(f, "{}:{}", c.epoch, shorten(&c.root.to_string())),
            None => f.write_str("none"),
        }
    }
}

/// Builds a `key=value, key=value` status line.
#[derive(Debug, Default)]
pub(crate) struct StatusLine {
    fields: Vec<String>,
}

impl StatusLine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn field(mut self, key: &str, value: impl Display) -> Self {
        self.fields.push(format!("{key}={value}"));
        self
    }

    /// Appends the fields shared by most waits: fork, clock and head slot,
    /// head root.
    pub(crate) fn head(self, clock_slot: Slot, head: &VersionedBlock) -> Self {
        self.field("fork", head.fork)
            .field("clock_slot", clock_slot)
            .field("slot", head.slot)
            .field("head", Short(Some(head.root)))
    }

    pub(crate) fn exec_payload(self, key: &str, hash: Option<ExecutionHash>) -> Self {
        self.field(key, Short(hash))
    }

    pub(crate) fn checkpoints(self, checkpoints: &FinalityCheckpoints) -> Self {
        self.field("justified", ShortCheckpoint(checkpoints.current_justified))
            .field("finalized", ShortCheckpoint(checkpoints.finalized))
    }

    pub(crate) fn finish(self) -> String {
        self.fields.join(", ")
    }
}

pub(crate) async fn fetch_head(node: &Node) -> Result<VersionedBlock, ProbeError> {
    node.consensus()
        .head_block(BlockId::Head)
        .await
        .map_err(|e| ProbeError::new("failed to poll head", e))
}

pub(crate) async fn fetch_finality(node: &Node) -> Result<FinalityCheckpoints, ProbeError> {
    node.consensus()
        .finality_checkpoints(StateId::Head)
        .await
        .map_err(|e| ProbeError::new("failed to poll finality checkpoint", e))
}

fn lagging(clock_slot: Slot, slot: Slot, threshold: Slot) -> bool {
    clock_slot > slot && clock_slot - slot >= threshold
}

/// Fails when the node's head is `max_missed` or more slots behind the
/// clock.
pub(crate) fn check_missed_slots(
    node: usize,
    clock_slot: Slot,
    slot: Slot,
    max_missed: Slot,
) -> Result<(), Error> {
    if lagging(clock_slot, slot, max_missed) {
        return Err(Error::MissedSlots {
            node,
            max_missed,
            clock_slot,
            slot,
        });
    }
    Ok(())
}

/// Fails when the node's head is an epoch or more behind the clock.
pub(crate) fn check_epoch_sync(
    node: usize,
    clock_slot: Slot,
    slot: Slot,
    slots_per_epoch: Slot,
) -> Result<(), Error> {
    if lagging(clock_slot, slot, slots_per_epoch) {
        return Err(Error::EpochNotSynced {
            node,
            clock_slot,
            slot,
        });
    }
    Ok(())
}
