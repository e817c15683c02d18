//! Record persistence
//!
//! Repository traits for the records the settlement core writes, plus an
//! in-memory implementation backed by `DashMap`. Writes are synchronous so they
//! can run inside a ledger transaction and abort it on failure.

use crate::{
    coaster::position::Position,
    errors::StoreError,
    fairness::SeedReveal,
    games::types::{GameParams, SettledGame},
    ledger::{CryptoTransaction, CurrencyMode, TransactionStatus},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Upper bound on the per-user recent-bets index.
const RECENT_BETS_PER_USER: usize = 500;

/// Immutable record of one settled bet.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BetRecord {
    pub id: String,
    pub user_id: String,
    pub params: GameParams,
    pub stake: u64,
    pub result: SettledGame,
    pub payout: u64,
    pub profit: i64,
    pub nonce: u64,
    pub client_seed: String,
    pub server_seed_hash: String,
    pub currency_mode: CurrencyMode,
    pub created_at: DateTime<Utc>,
}

pub trait BetRepository: Send + Sync {
    fn insert_bet(&self, record: &BetRecord) -> Result<(), StoreError>;
    fn get_bet(&self, bet_id: &str) -> Option<BetRecord>;
    /// Newest first.
    fn recent_bets(&self, user_id: &str, limit: usize) -> Vec<BetRecord>;
}

pub trait PositionRepository: Send + Sync {
    /// Insert or overwrite by position id.
    fn save_position(&self, position: &Position) -> Result<(), StoreError>;
    fn get_position(&self, position_id: &str) -> Option<Position>;
    fn positions_for_round(&self, round_id: &str) -> Vec<Position>;
}

pub trait SeedRevealRepository: Send + Sync {
    fn archive_reveal(&self, reveal: &SeedReveal) -> Result<(), StoreError>;
    fn reveal_by_hash(&self, server_seed_hash: &str) -> Option<SeedReveal>;
}

pub trait TransactionRepository: Send + Sync {
    fn insert_transaction(&self, tx: &CryptoTransaction) -> Result<(), StoreError>;
    fn get_transaction(&self, tx_id: &str) -> Option<CryptoTransaction>;
    /// Moves `tx_id` from `expected` to `next`, recording the processor's
    /// payment id and paid amount. Returns `Ok(false)` when the stored status
    /// is no longer `expected`; the caller lost the race.
    fn compare_and_set_status(
        &self,
        tx_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
        external_payment_id: Option<&str>,
        paid_amount: Option<u64>,
    ) -> Result<bool, StoreError>;
}

/// Everything the platform persists, behind one handle.
pub trait Store: BetRepository + PositionRepository + SeedRevealRepository + TransactionRepository {}

impl<T> Store for T where T: BetRepository + PositionRepository + SeedRevealRepository + TransactionRepository {}

#[derive(Default)]
pub struct MemoryStore {
    bets: DashMap<String, BetRecord>,
    recent: DashMap<String, VecDeque<String>>,
    positions: DashMap<String, Position>,
    reveals: DashMap<String, SeedReveal>,
    transactions: DashMap<String, CryptoTransaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bet_count(&self) -> usize {
        self.bets.len()
    }
}

impl BetRepository for MemoryStore {
    fn insert_bet(&self, record: &BetRecord) -> Result<(), StoreError> {
        if self.bets.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        self.bets.insert(record.id.clone(), record.clone());

        let mut index = self.recent.entry(record.user_id.clone()).or_default();
        index.push_front(record.id.clone());
        index.truncate(RECENT_BETS_PER_USER);

        debug!(bet_id = %record.id, user_id = %record.user_id, nonce = record.nonce, "Stored bet record");
        Ok(())
    }

    fn get_bet(&self, bet_id: &str) -> Option<BetRecord> {
        self.bets.get(bet_id).map(|r| r.clone())
    }

    fn recent_bets(&self, user_id: &str, limit: usize) -> Vec<BetRecord> {
        let Some(index) = self.recent.get(user_id) else {
            return Vec::new();
        };
        index.iter().take(limit).filter_map(|id| self.get_bet(id)).collect()
    }
}

impl PositionRepository for MemoryStore {
    fn save_position(&self, position: &Position) -> Result<(), StoreError> {
        self.positions.insert(position.id.clone(), position.clone());
        Ok(())
    }

    fn get_position(&self, position_id: &str) -> Option<Position> {
        self.positions.get(position_id).map(|p| p.clone())
    }

    fn positions_for_round(&self, round_id: &str) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .filter(|p| p.round_id == round_id)
            .map(|p| p.clone())
            .collect();
        positions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
        positions
    }
}

impl SeedRevealRepository for MemoryStore {
    fn archive_reveal(&self, reveal: &SeedReveal) -> Result<(), StoreError> {
        if self.reveals.contains_key(&reveal.server_seed_hash) {
            return Err(StoreError::Duplicate(reveal.server_seed_hash.clone()));
        }
        self.reveals.insert(reveal.server_seed_hash.clone(), reveal.clone());
        Ok(())
    }

    fn reveal_by_hash(&self, server_seed_hash: &str) -> Option<SeedReveal> {
        self.reveals.get(server_seed_hash).map(|r| r.clone())
    }
}

impl TransactionRepository for MemoryStore {
    fn insert_transaction(&self, tx: &CryptoTransaction) -> Result<(), StoreError> {
        if self.transactions.contains_key(&tx.id) {
            return Err(StoreError::Duplicate(tx.id.clone()));
        }
        self.transactions.insert(tx.id.clone(), tx.clone());
        Ok(())
    }

    fn get_transaction(&self, tx_id: &str) -> Option<CryptoTransaction> {
        self.transactions.get(tx_id).map(|t| t.clone())
    }

    fn compare_and_set_status(
        &self,
        tx_id: &str,
        expected: TransactionStatus,
        next: TransactionStatus,
        external_payment_id: Option<&str>,
        paid_amount: Option<u64>,
    ) -> Result<bool, StoreError> {
        let mut tx = self
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| StoreError::NotFound(tx_id.to_string()))?;
        if tx.status != expected {
            return Ok(false);
        }
        tx.status = next;
        if let Some(payment_id) = external_payment_id {
            tx.external_payment_id = Some(payment_id.to_string());
        }
        if paid_amount.is_some() {
            tx.paid_amount = paid_amount;
        }
        tx.updated_at = Utc::now();
        Ok(true)
    }
}
