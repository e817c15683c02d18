//! Bet settlement pipeline
//!
//! validate -> lock seed pair -> check commitment -> compute outcome ->
//! (ledger delta + bet record) -> advance nonce -> hooks.
//!
//! Anything that fails before the ledger transaction commits leaves no trace:
//! the balance is untouched, no record exists and the nonce is not consumed.

use crate::{
    errors::WagerResult,
    fairness::{Commitment, FairnessManager},
    games::{
        processor::GameProcessor,
        types::{BetRequest, BetResponse},
    },
    hooks::HookRegistry,
    ledger::Ledger,
    store::{BetRecord, BetRepository},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

pub struct Orchestrator {
    processor: GameProcessor,
    fairness: Arc<FairnessManager>,
    ledger: Arc<Ledger>,
    bets: Arc<dyn BetRepository>,
    hooks: HookRegistry,
}

impl Orchestrator {
    pub fn new(
        processor: GameProcessor,
        fairness: Arc<FairnessManager>,
        ledger: Arc<Ledger>,
        bets: Arc<dyn BetRepository>,
        hooks: HookRegistry,
    ) -> Self {
        Self {
            processor,
            fairness,
            ledger,
            bets,
            hooks,
        }
    }

    pub fn processor(&self) -> &GameProcessor {
        &self.processor
    }

    pub async fn commitment(&self, user_id: &str) -> Commitment {
        self.fairness.get_commitment(user_id).await
    }

    pub async fn place_bet(&self, user_id: &str, request: BetRequest) -> WagerResult<BetResponse> {
        self.processor.validate(request.stake, &request.params)?;

        let mut pair = self.fairness.lock(user_id).await;
        let settled = self.processor.settle(
            request.stake,
            &request.params,
            &request.client_seed,
            request.nonce,
            &pair,
        )?;

        let record = BetRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            params: request.params.clone(),
            stake: request.stake,
            payout: settled.payout,
            profit: settled.profit,
            result: settled,
            nonce: pair.nonce,
            client_seed: pair.client_seed.clone(),
            server_seed_hash: pair.server_seed_hash.clone(),
            currency_mode: request.currency_mode,
            created_at: Utc::now(),
        };

        let delta = self.ledger.transact(user_id, |balance| -> WagerResult<i64> {
            let delta = balance.apply_settlement(record.stake, record.payout, record.currency_mode)?;
            self.bets.insert_bet(&record)?;
            Ok(delta)
        })?;
        debug_assert_eq!(delta, record.profit);

        let revealed = self.fairness.finish_bet(user_id, &mut pair);
        let next = pair.commitment();
        drop(pair);

        info!(
            user_id,
            bet_id = %record.id,
            game = %record.result.game_type,
            nonce = record.nonce,
            stake = record.stake,
            payout = record.payout,
            profit = record.profit,
            "Bet settled"
        );

        let failed_hooks = self.hooks.run(&record).await;
        if failed_hooks > 0 {
            debug!(bet_id = %record.id, failed_hooks, "Bet kept despite hook failures");
        }

        Ok(BetResponse {
            bet_id: record.id,
            payout: record.payout,
            profit: record.profit,
            result: record.result,
            server_seed_hash: record.server_seed_hash,
            client_seed: record.client_seed,
            nonce: record.nonce,
            next_server_seed_hash: next.server_seed_hash,
            next_nonce: next.nonce,
            revealed_server_seed: revealed.map(|r| r.server_seed),
        })
    }

    pub fn bet(&self, bet_id: &str) -> Option<BetRecord> {
        self.bets.get_bet(bet_id)
    }

    pub fn recent_bets(&self, user_id: &str, limit: usize) -> Vec<BetRecord> {
        self.bets.recent_bets(user_id, limit)
    }
}
