//! One [`ProbeStrategy`](crate::ProbeStrategy) per convergence goal.

mod epoch_finalization;
mod execution_finality;
mod finality;
mod fork;
mod head;
mod payload;
mod slot_count;

pub use epoch_finalization::EpochFinalization;
pub use execution_finality::ExecutionFinality;
pub use finality::Finality;
pub use fork::ForkActivation;
pub use head::HeadConvergence;
pub use payload::PayloadAvailability;
pub use slot_count::SlotCount;

use proven_beacon_client::{ChainSpec, Node, Slot};
use tracing::debug;

use crate::Error;
use crate::health::compute_health;
use crate::results::{ProbeError, ProbeOutcome};

/// Why a probe stopped before producing a status line.
enum Interrupt {
    Failed(ProbeError),
    Fatal(Error),
}

impl From<ProbeError> for Interrupt {
    fn from(e: ProbeError) -> Self {
        Self::Failed(e)
    }
}

impl From<Error> for Interrupt {
    fn from(e: Error) -> Self {
        Self::Fatal(e)
    }
}

type Observation<T> = Result<ProbeOutcome<T>, Interrupt>;

fn settle<T>(observation: Observation<T>) -> ProbeOutcome<T> {
    match observation {
        Ok(outcome) => outcome,
        Err(Interrupt::Failed(e)) => ProbeOutcome::Failed(e),
        Err(Interrupt::Fatal(e)) => ProbeOutcome::Fatal(e),
    }
}

/// Health for a status line. Errors only cost the score.
pub(crate) async fn status_health(node: &Node, spec: &ChainSpec, slot: Slot) -> f64 {
    match compute_health(node.consensus(), spec, slot).await {
        Ok(health) => health,
        Err(e) => {
            debug!("{node}: health at slot {slot} unavailable: {e}");
            0.0
        }
    }
}

/// Formats a health score the way status lines show it.
pub(crate) fn health_field(health: f64) -> String {
    format!("{health:.2}")
}
