//! Network health score: how closely validator rewards track what the
//! protocol would pay a perfectly participating network.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_integer::Roots;
use num_traits::{ToPrimitive, Zero};
use proven_beacon_client::{
    BASE_REWARDS_PER_EPOCH, ChainSpec, ConsensusClient, Fork, MAX_PARTICIPATION_SCORE, Slot,
    StateId, ValidatorBalance, ValidatorIndex,
};

use crate::{Error, Result};

/// Computes the health score of the network at `slot` as seen by `client`.
///
/// States carrying a participation registry score the mean participation
/// flags. Phase0 states score the average balance gain over the previous
/// epoch against the expected base reward. Scores are never negative.
///
/// # Errors
///
/// Fails when the state or balances cannot be fetched, on a non-phase0
/// state without a registry, and when there is nothing to score.
pub async fn compute_health(
    client: &dyn ConsensusClient,
    spec: &ChainSpec,
    slot: Slot,
) -> Result<f64> {
    let state = client.state(StateId::Slot(slot)).await?;

    if let Some(participation) = &state.current_epoch_participation {
        return Ok(participation_health(participation));
    }
    if state.fork != Fork::Phase0 {
        return Err(Error::UnsupportedState(state.fork));
    }

    let epoch = spec.slot_to_epoch(slot);
    let active: Vec<ValidatorIndex> = (0u64..)
        .zip(&state.validators)
        .filter(|(_, v)| v.is_active_at(epoch))
        .map(|(index, _)| index)
        .collect();
    if active.is_empty() {
        return Err(Error::InsufficientValidators);
    }

    // At genesis there is no previous epoch; both samples come from epoch 0.
    let before_epoch = epoch.saturating_sub(1);
    let before = client
        .validator_balances(StateId::Slot(spec.epoch_start_slot(before_epoch)), &active)
        .await?;
    let after = client
        .validator_balances(StateId::Slot(spec.epoch_start_slot(epoch)), &active)
        .await?;

    balance_health(spec, &before, &after)
}

/// Mean of the participation flags over the maximum flag sum.
fn participation_health(participation: &[u8]) -> f64 {
    if participation.is_empty() {
        return 0.0;
    }
    let sum: u64 = participation.iter().map(|&p| u64::from(p)).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / participation.len() as f64;
    mean / f64::from(MAX_PARTICIPATION_SCORE)
}

/// Average balance gain between two epoch boundaries over the reward a
/// validator is expected to earn per epoch.
///
/// Only validators present in both samples are scored; nodes leave out
/// validators that do not exist yet in the requested state.
fn balance_health(
    spec: &ChainSpec,
    before: &[ValidatorBalance],
    after: &[ValidatorBalance],
) -> Result<f64> {
    let previous: HashMap<ValidatorIndex, u64> =
        before.iter().map(|b| (b.index, b.balance)).collect();
    let pairs: Vec<(u64, u64)> = after
        .iter()
        .filter_map(|b| previous.get(&b.index).map(|&prev| (prev, b.balance)))
        .collect();
    if pairs.is_empty() {
        return Err(Error::InsufficientValidators);
    }

    let sum_before: BigUint = pairs.iter().map(|&(prev, _)| BigUint::from(prev)).sum();
    let sum_after: BigUint = pairs.iter().map(|&(_, next)| BigUint::from(next)).sum();

    let sqrt_total = Roots::sqrt(&sum_before);
    if sqrt_total.is_zero() {
        return Err(Error::InsufficientValidators);
    }
    let avg_before = &sum_before / BigUint::from(pairs.len());
    let reward = avg_before * spec.base_reward_factor / sqrt_total / spec.hysteresis_quotient;
    let expected = reward * BASE_REWARDS_PER_EPOCH;
    if expected.is_zero() {
        return Err(Error::InsufficientValidators);
    }

    let to_f64 = |n: &BigUint| n.to_f64().unwrap_or(f64::MAX);
    #[allow(clippy::cast_precision_loss)]
    let count = pairs.len() as f64;
    let gain = (to_f64(&sum_after) - to_f64(&sum_before)) / count;
    Ok((gain / to_f64(&expected)).max(0.0))
}
