//! Independent verification of past outcomes
//!
//! Everything here recomputes from revealed material only; none of it reads
//! live seed state.

use crate::{
    coaster::price::{replay_prices, WalkParams},
    errors::{FairnessError, StoreError, WagerResult},
    fairness::SeedReveal,
    games::{
        fair_rng::{hash_seed, SeedContext},
        processor::GameProcessor,
        types::{GameParams, SettledGame},
    },
    store::{BetRepository, BetRecord, SeedRevealRepository},
};

fn check_commitment(server_seed: &str, server_seed_hash: &str) -> Result<(), FairnessError> {
    if hash_seed(server_seed) == server_seed_hash {
        Ok(())
    } else {
        Err(FairnessError::CommitmentMismatch)
    }
}

/// Outcome for the given inputs, as any third party would compute it.
pub fn recompute(
    processor: &GameProcessor,
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    stake: u64,
    params: &GameParams,
) -> SettledGame {
    processor.replay(stake, params, &SeedContext::new(server_seed, client_seed, nonce))
}

/// Check a stored bet against a revealed server seed.
pub fn verify_bet(processor: &GameProcessor, record: &BetRecord, server_seed: &str) -> Result<SettledGame, FairnessError> {
    check_commitment(server_seed, &record.server_seed_hash)?;
    let recomputed = recompute(
        processor,
        server_seed,
        &record.client_seed,
        record.nonce,
        record.stake,
        &record.params,
    );
    if recomputed != record.result || recomputed.payout != record.payout {
        return Err(FairnessError::OutcomeMismatch(record.id.clone()));
    }
    Ok(recomputed)
}

/// Look up a bet and its archived seed, then verify. Fails with
/// `RevealNotFound` while the seed is still active.
pub fn verify_stored_bet<S>(processor: &GameProcessor, store: &S, bet_id: &str) -> WagerResult<SettledGame>
where
    S: BetRepository + SeedRevealRepository + ?Sized,
{
    let record = store
        .get_bet(bet_id)
        .ok_or_else(|| StoreError::NotFound(bet_id.to_string()))?;
    let reveal = store
        .reveal_by_hash(&record.server_seed_hash)
        .ok_or_else(|| FairnessError::RevealNotFound(record.server_seed_hash.clone()))?;
    Ok(verify_bet(processor, &record, &reveal.server_seed)?)
}

/// Replay a finished Coaster round from its reveal. The round id doubles as
/// the reveal's client seed and `final_nonce` is the last tick played.
pub fn verify_round(reveal: &SeedReveal, params: WalkParams) -> Result<Vec<f64>, FairnessError> {
    check_commitment(&reveal.server_seed, &reveal.server_seed_hash)?;
    Ok(replay_prices(&reveal.server_seed, &reveal.client_seed, reveal.final_nonce, params))
}
