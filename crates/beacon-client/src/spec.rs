//! Consensus protocol parameters the monitor depends on.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{Epoch, Slot};

/// Number of base rewards a perfectly performing validator earns per epoch.
pub const BASE_REWARDS_PER_EPOCH: u64 = 4;

/// Sum of all participation flag bits (source, target, head).
pub const MAX_PARTICIPATION_SCORE: u8 = 7;

/// Protocol parameters of the chain under observation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSpec {
    /// Duration of one slot in seconds.
    pub seconds_per_slot: u64,

    /// Number of slots in an epoch.
    pub slots_per_epoch: u64,

    /// Base reward factor used by the pre-Altair reward formula.
    pub base_reward_factor: u64,

    /// Hysteresis quotient used by the pre-Altair reward formula.
    pub hysteresis_quotient: u64,

    /// Total difficulty at which the execution layer hands over to the
    /// beacon chain. `None` when the merge is already behind genesis.
    #[serde(with = "decimal")]
    pub terminal_total_difficulty: Option<BigUint>,
}

impl Default for ChainSpec {
    fn default() -> Self {
        Self {
            seconds_per_slot: 12,
            slots_per_epoch: 32,
            base_reward_factor: 64,
            hysteresis_quotient: 4,
            terminal_total_difficulty: None,
        }
    }
}

impl ChainSpec {
    /// Returns the epoch containing `slot`.
    #[must_use]
    pub const fn slot_to_epoch(&self, slot: Slot) -> Epoch {
        slot / self.slots_per_epoch
    }

    /// Returns the first slot of `epoch`.
    #[must_use]
    pub const fn epoch_start_slot(&self, epoch: Epoch) -> Slot {
        epoch * self.slots_per_epoch
    }
}

/// Big integers travel as decimal strings in config files.
mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&value.to_str_radix(10)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<BigUint>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| {
                BigUint::parse_bytes(s.as_bytes(), 10)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid integer: {s}")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_arithmetic() {
        let spec = ChainSpec::default();
        assert_eq!(spec.slot_to_epoch(0), 0);
        assert_eq!(spec.slot_to_epoch(31), 0);
        assert_eq!(spec.slot_to_epoch(32), 1);
        assert_eq!(spec.epoch_start_slot(3), 96);
    }

    #[test]
    fn test_ttd_is_a_decimal_string() {
        let spec = ChainSpec {
            terminal_total_difficulty: Some(BigUint::from(58_750_000_000_000_000_000_000u128)),
            ..ChainSpec::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["terminal_total_difficulty"], "58750000000000000000000");

        let back: ChainSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let spec: ChainSpec = serde_json::from_str(r#"{"seconds_per_slot": 6}"#).unwrap();
        assert_eq!(spec.seconds_per_slot, 6);
        assert_eq!(spec.slots_per_epoch, 32);
        assert_eq!(spec.terminal_total_difficulty, None);
    }
}
