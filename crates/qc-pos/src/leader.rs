//! Deterministic, stake-weighted leader selection.

use qc_consensus_core::EngineError;
use shared_types::Validator;
use sha2::{Digest, Sha256};

/// Validators eligible to lead a round: active, not slashed, staking at
/// least `min_stake`, and active within `inactivity_bound_secs` of `now`.
pub fn eligible_validators<'a>(
    validators: &'a [Validator],
    min_stake: u64,
    inactivity_bound_secs: i64,
    now: i64,
) -> Vec<&'a Validator> {
    let mut eligible: Vec<&Validator> = validators
        .iter()
        .filter(|v| v.is_eligible())
        .filter(|v| v.stake >= min_stake)
        .filter(|v| now - v.last_active <= inactivity_bound_secs)
        .collect();
    eligible.sort_by_key(|v| v.address.as_bytes().to_vec());
    eligible
}

/// A seed derived from `round`, reduced modulo the total eligible stake.
///
/// The digest is folded in as the full 32-byte unsigned big-endian
/// integer, not truncated to its first 8 bytes — truncating first would
/// both diverge from the intended `SHA-256(round) mod total_stake` value
/// and introduce modulo bias from discarding the rest of the digest.
fn target_for_round(round: u64, total_stake: u64) -> u64 {
    let digest = Sha256::digest(round.to_be_bytes());
    let total_stake = total_stake as u128;
    let target = digest.iter().fold(0u128, |acc, &b| (acc * 256 + b as u128) % total_stake);
    target as u64
}

/// Select the round's leader: seed `target = SHA-256(round) mod
/// total_eligible_stake`, then walk validators in ascending-address order
/// accumulating stake until the running total exceeds `target`.
///
/// Pure function of `(validators, round, min_stake, inactivity_bound_secs,
/// now)` — any two nodes with the same inputs pick the same leader.
pub fn select_leader(
    validators: &[Validator],
    round: u64,
    min_stake: u64,
    inactivity_bound_secs: i64,
    now: i64,
) -> Result<Validator, EngineError> {
    let eligible = eligible_validators(validators, min_stake, inactivity_bound_secs, now);
    let total_stake: u64 = eligible.iter().map(|v| v.stake).sum();
    if eligible.is_empty() || total_stake == 0 {
        return Err(EngineError::InsufficientStake);
    }

    let target = target_for_round(round, total_stake);
    let mut running = 0u64;
    for v in &eligible {
        running += v.stake;
        if running > target {
            return Ok((*v).clone());
        }
    }
    // Unreachable given `target < total_stake`, but fall back to the last
    // eligible validator rather than panic on a floating rounding surprise.
    Ok((*eligible.last().unwrap()).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Address, ValidatorStatus};

    fn validator(b: u8, stake: u64) -> Validator {
        Validator {
            address: Address([b; 20]),
            public_key: [0u8; 32],
            stake,
            power: stake,
            status: ValidatorStatus::Active,
            last_active: 0,
            shard_id: 0,
            reputation: 1.0,
        }
    }

    #[test]
    fn selection_is_deterministic() {
        let vs = vec![validator(1, 10), validator(2, 20), validator(3, 30)];
        let a = select_leader(&vs, 7, 0, 3600, 0).unwrap();
        let b = select_leader(&vs, 7, 0, 3600, 0).unwrap();
        assert_eq!(a.address, b.address);
    }

    #[test]
    fn excludes_slashed_and_underfunded_and_inactive() {
        let mut vs = vec![validator(1, 10), validator(2, 20), validator(3, 30)];
        vs[0].status = ValidatorStatus::Slashed;
        vs[1].last_active = -10_000;
        let eligible = eligible_validators(&vs, 5, 3600, 0);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].address, vs[2].address);
    }

    #[test]
    fn no_eligible_validators_is_insufficient_stake() {
        let vs = vec![validator(1, 1)];
        let result = select_leader(&vs, 0, 100, 3600, 0);
        assert!(matches!(result, Err(EngineError::InsufficientStake)));
    }

    #[test]
    fn single_validator_always_wins() {
        let vs = vec![validator(1, 50)];
        for round in 0..20 {
            assert_eq!(select_leader(&vs, round, 0, 3600, 0).unwrap().address, vs[0].address);
        }
    }
}
