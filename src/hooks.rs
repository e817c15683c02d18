//! Post-settlement hooks
//!
//! Bonus wagering, affiliate commission and similar subsystems observe settled
//! bets through [`SettlementHook`]. They run after the bet is committed; a
//! failing hook is logged and never affects the bet.

use crate::store::BetRecord;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

pub type HookResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[async_trait]
pub trait SettlementHook: Send + Sync {
    fn name(&self) -> &str;

    async fn on_bet_settled(&self, record: &BetRecord) -> HookResult;
}

#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn SettlementHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn SettlementHook>) {
        debug!(hook = hook.name(), "Registered settlement hook");
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook concurrently. Returns how many failed.
    pub async fn run(&self, record: &BetRecord) -> usize {
        let results = join_all(self.hooks.iter().map(|hook| async move {
            (hook.name(), hook.on_bet_settled(record).await)
        }))
        .await;

        let mut failures = 0;
        for (name, result) in results {
            if let Err(e) = result {
                failures += 1;
                warn!(
                    hook = name,
                    bet_id = %record.id,
                    user_id = %record.user_id,
                    error = %e,
                    "Settlement hook failed"
                );
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{CoinSide, GameData, GameParams, GameType, SettledGame};
    use crate::ledger::CurrencyMode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl SettlementHook for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn on_bet_settled(&self, _record: &BetRecord) -> HookResult {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl SettlementHook for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn on_bet_settled(&self, _record: &BetRecord) -> HookResult {
            Err("affiliate service unavailable".into())
        }
    }

    fn record() -> BetRecord {
        let result = SettledGame::new(GameType::CoinFlip, GameData::CoinFlip { side: CoinSide::Tails }, 10, 0, 1.94);
        BetRecord {
            id: "bet-1".to_string(),
            user_id: "alice".to_string(),
            params: GameParams::CoinFlip { choice: CoinSide::Heads },
            stake: 10,
            payout: 0,
            profit: -10,
            result,
            nonce: 0,
            client_seed: "abc".to_string(),
            server_seed_hash: "hash".to_string(),
            currency_mode: CurrencyMode::PlayCredits,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_later_hooks() {
        let counting = Arc::new(Counting(AtomicUsize::new(0)));
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(Failing));
        registry.register(counting.clone());

        assert_eq!(registry.run(&record()).await, 1);
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 2);
    }
}
