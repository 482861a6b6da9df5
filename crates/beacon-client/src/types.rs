//! Identifiers, blocks, states and selectors reported by beacon nodes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

/// A slot number.
pub type Slot = u64;

/// An epoch number.
pub type Epoch = u64;

/// Index of a validator in the registry.
pub type ValidatorIndex = u64;

/// A balance in gwei.
pub type Gwei = u64;

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, Eq, Hash, PartialEq, Ord, PartialOrd)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// The all-zero value.
            pub const ZERO: Self = Self([0; 32]);

            /// Returns `None` for the all-zero value, which nodes use on the
            /// wire for "not yet observed".
            #[must_use]
            pub fn non_zero(self) -> Option<Self> {
                if self == Self::ZERO { None } else { Some(self) }
            }

            /// Returns the raw bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($name))
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(digits, &mut bytes)
                    .map_err(|e| Error::Decode(format!("invalid {}: {e}", stringify!($name))))?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// Hash tree root of a beacon block or state.
    Root
);

fixed_bytes!(
    /// Hash of an execution-layer block.
    ExecutionHash
);

/// A (root, epoch) pair marking a justified or finalized point in the chain.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Epoch of the checkpoint.
    pub epoch: Epoch,

    /// Block root of the checkpoint.
    pub root: Root,
}

impl Checkpoint {
    /// Creates a new checkpoint.
    #[must_use]
    pub const fn new(epoch: Epoch, root: Root) -> Self {
        Self { epoch, root }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.epoch, self.root)
    }
}

/// Finality checkpoints as seen by a node.
///
/// A checkpoint the node has not observed yet is `None`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct FinalityCheckpoints {
    /// The current justified checkpoint.
    pub current_justified: Option<Checkpoint>,

    /// The finalized checkpoint.
    pub finalized: Option<Checkpoint>,
}

/// Named protocol upgrades of the consensus layer.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fork {
    /// Genesis protocol.
    Phase0,
    /// Introduces participation flags.
    Altair,
    /// The merge.
    Bellatrix,
    /// Withdrawals.
    Capella,
    /// Blobs.
    Deneb,
    /// Validator consolidation.
    Electra,
    /// Data availability sampling.
    Fulu,
}

impl Fork {
    /// Returns the fork name as reported by beacon nodes.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Phase0 => "phase0",
            Self::Altair => "altair",
            Self::Bellatrix => "bellatrix",
            Self::Capella => "capella",
            Self::Deneb => "deneb",
            Self::Electra => "electra",
            Self::Fulu => "fulu",
        }
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Fork {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "phase0" => Ok(Self::Phase0),
            "altair" => Ok(Self::Altair),
            "bellatrix" => Ok(Self::Bellatrix),
            "capella" => Ok(Self::Capella),
            "deneb" => Ok(Self::Deneb),
            "electra" => Ok(Self::Electra),
            "fulu" => Ok(Self::Fulu),
            other => Err(Error::Decode(format!("unknown fork: {other}"))),
        }
    }
}

/// A beacon block summary tagged with the fork that governs it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VersionedBlock {
    /// Fork of the block.
    pub fork: Fork,

    /// Slot of the block.
    pub slot: Slot,

    /// Block root.
    pub root: Root,

    /// Hash of the execution payload, when the block carries a non-empty one.
    pub execution_hash: Option<ExecutionHash>,
}

/// A validator registry entry, reduced to what health scoring needs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    /// Epoch at which the validator became eligible for activation.
    pub activation_eligibility_epoch: Epoch,

    /// Epoch at which the validator exits (`u64::MAX` when not exiting).
    pub exit_epoch: Epoch,

    /// Whether the validator has been slashed.
    pub slashed: bool,

    /// Effective balance.
    pub effective_balance: Gwei,
}

impl Validator {
    /// Whether the validator counts as active at `epoch`: eligible, not yet
    /// exited and not slashed.
    #[must_use]
    pub const fn is_active_at(&self, epoch: Epoch) -> bool {
        epoch >= self.activation_eligibility_epoch && epoch < self.exit_epoch && !self.slashed
    }
}

/// A beacon state, reduced to what health scoring needs.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BeaconState {
    /// Fork of the state.
    pub fork: Fork,

    /// Slot of the state.
    pub slot: Slot,

    /// Per-validator participation flags for the current epoch. Present
    /// from Altair onwards.
    pub current_epoch_participation: Option<Vec<u8>>,

    /// Validator registry.
    pub validators: Vec<Validator>,
}

/// A validator balance at some state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidatorBalance {
    /// Validator index.
    pub index: ValidatorIndex,

    /// Balance.
    pub balance: Gwei,
}

/// Selects a beacon block.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BlockId {
    /// The canonical head.
    Head,
    /// The finalized block.
    Finalized,
    /// The canonical block at a slot.
    Slot(Slot),
    /// A block by root.
    Root(Root),
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => f.write_str("head"),
            Self::Finalized => f.write_str("finalized"),
            Self::Slot(slot) => write!(f, "{slot}"),
            Self::Root(root) => write!(f, "{root}"),
        }
    }
}

/// Selects a beacon state.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StateId {
    /// The state at the canonical head.
    Head,
    /// The finalized state.
    Finalized,
    /// The canonical state at a slot.
    Slot(Slot),
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => f.write_str("head"),
            Self::Finalized => f.write_str("finalized"),
            Self::Slot(slot) => write!(f, "{slot}"),
        }
    }
}

/// Selects an execution-layer block.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BlockNumber {
    /// The latest block.
    #[default]
    Latest,
    /// A block by number.
    Number(u64),
}
