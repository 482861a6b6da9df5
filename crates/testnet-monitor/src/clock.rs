//! Slot and epoch arithmetic on the chain's discrete time grid.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use proven_beacon_client::{ChainSpec, Epoch, Slot};
use tokio::time::{Instant, Sleep};

use crate::WaitContext;

/// Slots added to every deadline so the last legitimate observation does
/// not race the timeout.
pub const SLOTS_TOLERANCE: Slot = 2;

/// Wall clock driven by the tokio timer.
///
/// Reads `SystemTime` once at construction and advances it with
/// `tokio::time::Instant`, so a paused test runtime moves it forward
/// together with the slot ticker.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    anchor_time: SystemTime,
    anchor_instant: Instant,
}

impl WallClock {
    /// Anchors a new clock at the current time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            anchor_time: SystemTime::now(),
            anchor_instant: Instant::now(),
        }
    }

    /// Current wall-clock time.
    #[must_use]
    pub fn now(&self) -> SystemTime {
        self.anchor_time + self.anchor_instant.elapsed()
    }

    /// Current time as seconds since the unix epoch.
    #[must_use]
    pub fn unix_now(&self) -> u64 {
        self.now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs())
    }

    /// Translates a wall-clock time into a tokio instant.
    #[must_use]
    pub fn instant_at(&self, time: SystemTime) -> Instant {
        let now = self.now();
        let instant = Instant::now();
        match time.duration_since(now) {
            Ok(ahead) => instant + ahead,
            Err(behind) => instant
                .checked_sub(behind.duration())
                .unwrap_or(instant),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Time arithmetic for one chain: derived once from the genesis time and
/// the protocol's slot parameters, immutable afterwards.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SlotClock {
    genesis_time: u64,
    seconds_per_slot: u64,
    slots_per_epoch: u64,
    tolerance: Slot,
}

impl SlotClock {
    /// Creates a clock for a chain with genesis at `genesis_time` (unix
    /// seconds).
    #[must_use]
    pub const fn new(genesis_time: u64, spec: &ChainSpec) -> Self {
        Self {
            genesis_time,
            seconds_per_slot: spec.seconds_per_slot,
            slots_per_epoch: spec.slots_per_epoch,
            tolerance: SLOTS_TOLERANCE,
        }
    }

    /// Overrides the slot tolerance added to deadlines.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: Slot) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Genesis time in unix seconds.
    #[must_use]
    pub const fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    /// Genesis as a wall-clock time.
    #[must_use]
    pub fn genesis(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(self.genesis_time)
    }

    /// Duration of one slot.
    #[must_use]
    pub const fn slot_duration(&self) -> Duration {
        Duration::from_secs(self.seconds_per_slot)
    }

    /// Number of slots per epoch.
    #[must_use]
    pub const fn slots_per_epoch(&self) -> Slot {
        self.slots_per_epoch
    }

    /// Slot at wall-clock time `now`.
    ///
    /// Only meaningful at or after genesis; earlier times map to slot 0, as
    /// does every time on a chain with zero-length slots.
    #[must_use]
    pub fn slot_at(&self, now: SystemTime) -> Slot {
        let elapsed = now
            .duration_since(self.genesis())
            .map_or(0, |d| d.as_secs());
        elapsed.checked_div(self.seconds_per_slot).unwrap_or(0)
    }

    /// Epoch containing `slot`.
    #[must_use]
    pub const fn epoch_at(&self, slot: Slot) -> Epoch {
        match slot.checked_div(self.slots_per_epoch) {
            Some(epoch) => epoch,
            None => 0,
        }
    }

    /// Slots in `epochs` epochs, saturating.
    const fn epoch_slots(&self, epochs: Epoch) -> Slot {
        self.slots_per_epoch.saturating_mul(epochs)
    }

    /// Length of `slots` slots, saturating.
    const fn slots_duration(&self, slots: Slot) -> Duration {
        Duration::from_secs(slots.saturating_mul(self.seconds_per_slot))
    }

    /// Timeout covering `epochs` epochs plus the slot tolerance.
    #[must_use]
    pub const fn epoch_timeout(&self, epochs: Epoch) -> Duration {
        self.slots_duration(self.epoch_slots(epochs).saturating_add(self.tolerance))
    }

    /// Timeout covering `slots` slots plus the slot tolerance.
    #[must_use]
    pub const fn slot_timeout(&self, slots: Slot) -> Duration {
        self.slots_duration(slots.saturating_add(self.tolerance))
    }

    /// Child context of `parent` that expires after `epochs` epochs plus
    /// tolerance.
    #[must_use]
    pub fn epoch_deadline(&self, parent: &WaitContext, epochs: Epoch) -> WaitContext {
        parent.with_timeout(self.epoch_timeout(epochs))
    }

    /// Child context of `parent` that expires after `slots` slots plus
    /// tolerance.
    #[must_use]
    pub fn slot_deadline(&self, parent: &WaitContext, slots: Slot) -> WaitContext {
        parent.with_timeout(self.slot_timeout(slots))
    }

    /// One-shot timer firing after exactly `epochs` epochs.
    #[must_use]
    pub fn epoch_timer(&self, epochs: Epoch) -> Sleep {
        tokio::time::sleep(self.slots_duration(self.epoch_slots(epochs)))
    }

    /// One-shot timer firing after exactly `slots` slots.
    #[must_use]
    pub fn slot_timer(&self, slots: Slot) -> Sleep {
        tokio::time::sleep(self.slots_duration(slots))
    }
}
