//! Dual-currency balance ledger
//!
//! Every user holds a play-credit track and a redeemable-cash track, each split
//! into `available` and `locked`. All mutation goes through
//! [`Ledger::transact`], which runs the closure against a copy of the balance
//! under the user's lock and commits only when the closure succeeds. That is
//! what makes "ledger delta + bet record" a single unit for callers.

pub mod payments;
pub mod webhook;

pub use payments::{CryptoTransaction, PaymentService, TransactionKind, TransactionStatus, WebhookAck};
pub use webhook::{WebhookPayload, WebhookVerifier};

use crate::errors::LedgerError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use tracing::info;

/// Which currency track a movement applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyMode {
    PlayCredits,
    RedeemableCash,
}

impl Default for CurrencyMode {
    fn default() -> Self {
        CurrencyMode::PlayCredits
    }
}

impl fmt::Display for CurrencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrencyMode::PlayCredits => write!(f, "play_credits"),
            CurrencyMode::RedeemableCash => write!(f, "redeemable_cash"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubAccount {
    pub available: u64,
    pub locked: u64,
}

/// Authoritative balance for one user.
///
/// `cash.available` is the redeemable-cash total that can be wagered;
/// `cash_redeemable` is the part of it that has cleared wagering and may be
/// withdrawn. `cash_redeemable <= cash.available` always holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    pub user_id: String,
    pub play: SubAccount,
    pub cash: SubAccount,
    pub cash_redeemable: u64,
    pub preference: CurrencyMode,
}

impl Balance {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            play: SubAccount::default(),
            cash: SubAccount::default(),
            cash_redeemable: 0,
            preference: CurrencyMode::default(),
        }
    }

    pub fn account(&self, mode: CurrencyMode) -> &SubAccount {
        match mode {
            CurrencyMode::PlayCredits => &self.play,
            CurrencyMode::RedeemableCash => &self.cash,
        }
    }

    fn account_mut(&mut self, mode: CurrencyMode) -> &mut SubAccount {
        match mode {
            CurrencyMode::PlayCredits => &mut self.play,
            CurrencyMode::RedeemableCash => &mut self.cash,
        }
    }

    pub fn available(&self, mode: CurrencyMode) -> u64 {
        self.account(mode).available
    }

    pub fn locked(&self, mode: CurrencyMode) -> u64 {
        self.account(mode).locked
    }

    pub fn debit(&mut self, amount: u64, mode: CurrencyMode) -> Result<(), LedgerError> {
        let account = self.account_mut(mode);
        account.available = account
            .available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                mode,
                requested: amount,
                available: account.available,
            })?;
        if mode == CurrencyMode::RedeemableCash {
            // Non-redeemable funds are spent first.
            self.cash_redeemable = self.cash_redeemable.min(self.cash.available);
        }
        Ok(())
    }

    pub fn credit(&mut self, amount: u64, mode: CurrencyMode) -> Result<(), LedgerError> {
        let user_id = self.user_id.clone();
        let account = self.account_mut(mode);
        account.available = account
            .available
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(user_id))?;
        Ok(())
    }

    /// Cash credit that is immediately withdrawable (settled deposits).
    pub fn credit_redeemable(&mut self, amount: u64) -> Result<(), LedgerError> {
        self.credit(amount, CurrencyMode::RedeemableCash)?;
        self.cash_redeemable += amount;
        Ok(())
    }

    /// Credit a settled payout. Cash winnings are withdrawable; only bridged
    /// and bonus credits stay outside the redeemable portion.
    pub fn credit_winnings(&mut self, amount: u64, mode: CurrencyMode) -> Result<(), LedgerError> {
        match mode {
            CurrencyMode::RedeemableCash => self.credit_redeemable(amount),
            CurrencyMode::PlayCredits => self.credit(amount, mode),
        }
    }

    /// Move funds from available to locked. Cash holds come out of the
    /// redeemable portion only.
    pub fn lock(&mut self, amount: u64, mode: CurrencyMode) -> Result<(), LedgerError> {
        if mode == CurrencyMode::RedeemableCash {
            if amount > self.cash_redeemable {
                return Err(LedgerError::InsufficientFunds {
                    mode,
                    requested: amount,
                    available: self.cash_redeemable,
                });
            }
            self.cash_redeemable -= amount;
        }
        self.debit(amount, mode)?;
        let account = self.account_mut(mode);
        account.locked += amount;
        Ok(())
    }

    /// Return locked funds to available.
    pub fn unlock(&mut self, amount: u64, mode: CurrencyMode) -> Result<(), LedgerError> {
        self.take_locked(amount, mode)?;
        if mode == CurrencyMode::RedeemableCash {
            self.credit_redeemable(amount)
        } else {
            self.credit(amount, mode)
        }
    }

    /// Finalize a hold: locked funds leave the ledger.
    pub fn consume_locked(&mut self, amount: u64, mode: CurrencyMode) -> Result<(), LedgerError> {
        self.take_locked(amount, mode)
    }

    fn take_locked(&mut self, amount: u64, mode: CurrencyMode) -> Result<(), LedgerError> {
        let account = self.account_mut(mode);
        account.locked = account
            .locked
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientLocked {
                mode,
                requested: amount,
                locked: account.locked,
            })?;
        Ok(())
    }

    /// Debit the stake and credit the payout as one step. Returns the net delta.
    pub fn apply_settlement(&mut self, stake: u64, payout: u64, mode: CurrencyMode) -> Result<i64, LedgerError> {
        self.debit(stake, mode)?;
        if payout > 0 {
            self.credit_winnings(payout, mode)?;
        }
        Ok(payout as i64 - stake as i64)
    }
}

/// Concurrent ledger keyed by user. Each balance sits behind its own mutex so
/// operations on one user never block another.
#[derive(Default)]
pub struct Ledger {
    balances: DashMap<String, Arc<Mutex<Balance>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    fn slot(&self, user_id: &str) -> Arc<Mutex<Balance>> {
        self.balances
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Balance::new(user_id))))
            .clone()
    }

    /// Run `f` against a copy of the user's balance; commit only on `Ok`.
    pub fn transact<T, E, F>(&self, user_id: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Balance) -> Result<T, E>,
    {
        let slot = self.slot(user_id);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }

    /// Like [`Ledger::transact`] but never waits: if another operation holds
    /// the user's balance this returns [`LedgerError::Contention`] at once.
    pub fn try_transact<T, E, F>(&self, user_id: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Balance) -> Result<T, E>,
        E: From<LedgerError>,
    {
        let slot = self.slot(user_id);
        let mut guard = match slot.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(LedgerError::Contention(user_id.to_string()).into()),
        };
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }

    pub fn balance(&self, user_id: &str) -> Balance {
        let slot = self.slot(user_id);
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    pub fn credit(&self, user_id: &str, amount: u64, mode: CurrencyMode) -> Result<Balance, LedgerError> {
        non_zero(amount)?;
        self.transact(user_id, |b| b.credit(amount, mode).map(|_| b.clone()))
    }

    pub fn debit(&self, user_id: &str, amount: u64, mode: CurrencyMode) -> Result<Balance, LedgerError> {
        non_zero(amount)?;
        self.transact(user_id, |b| b.debit(amount, mode).map(|_| b.clone()))
    }

    pub fn lock(&self, user_id: &str, amount: u64, mode: CurrencyMode) -> Result<Balance, LedgerError> {
        non_zero(amount)?;
        self.transact(user_id, |b| b.lock(amount, mode).map(|_| b.clone()))
    }

    pub fn unlock(&self, user_id: &str, amount: u64, mode: CurrencyMode) -> Result<Balance, LedgerError> {
        non_zero(amount)?;
        self.transact(user_id, |b| b.unlock(amount, mode).map(|_| b.clone()))
    }

    pub fn consume_locked(&self, user_id: &str, amount: u64, mode: CurrencyMode) -> Result<Balance, LedgerError> {
        non_zero(amount)?;
        self.transact(user_id, |b| b.consume_locked(amount, mode).map(|_| b.clone()))
    }

    /// Explicit conversion between tracks. Bridged cash is not redeemable
    /// until it clears wagering.
    pub fn bridge(&self, user_id: &str, from: CurrencyMode, to: CurrencyMode, amount: u64) -> Result<Balance, LedgerError> {
        non_zero(amount)?;
        if from == to {
            return Err(LedgerError::SameTrack(from));
        }
        let balance = self.transact(user_id, |b| {
            b.debit(amount, from)?;
            b.credit(amount, to)?;
            Ok::<_, LedgerError>(b.clone())
        })?;
        info!(user_id, amount, %from, %to, "Bridged funds between currency tracks");
        Ok(balance)
    }

    /// Mark part of the cash track withdrawable, e.g. once bonus wagering clears.
    pub fn release_redeemable(&self, user_id: &str, amount: u64) -> Result<Balance, LedgerError> {
        self.transact(user_id, |b| {
            let headroom = b.cash.available - b.cash_redeemable;
            if amount > headroom {
                return Err(LedgerError::InsufficientFunds {
                    mode: CurrencyMode::RedeemableCash,
                    requested: amount,
                    available: headroom,
                });
            }
            b.cash_redeemable += amount;
            Ok(b.clone())
        })
    }

    pub fn set_preference(&self, user_id: &str, mode: CurrencyMode) -> Balance {
        let slot = self.slot(user_id);
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.preference = mode;
        guard.clone()
    }
}

fn non_zero(amount: u64) -> Result<(), LedgerError> {
    if amount == 0 {
        Err(LedgerError::ZeroAmount)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_rejects_instead_of_clamping() {
        let ledger = Ledger::new();
        ledger.credit("alice", 100, CurrencyMode::PlayCredits).unwrap();

        let err = ledger.debit("alice", 150, CurrencyMode::PlayCredits).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                mode: CurrencyMode::PlayCredits,
                requested: 150,
                available: 100
            }
        );
        assert_eq!(ledger.balance("alice").play.available, 100);
    }

    #[test]
    fn test_tracks_are_independent() {
        let ledger = Ledger::new();
        ledger.credit("bob", 500, CurrencyMode::PlayCredits).unwrap();
        assert!(ledger.debit("bob", 1, CurrencyMode::RedeemableCash).is_err());
        assert_eq!(ledger.balance("bob").cash.available, 0);
    }

    #[test]
    fn test_lock_unlock_roundtrip() {
        let ledger = Ledger::new();
        ledger.transact("carol", |b| b.credit_redeemable(800)).unwrap();

        let locked = ledger.lock("carol", 500, CurrencyMode::RedeemableCash).unwrap();
        assert_eq!(locked.cash, SubAccount { available: 300, locked: 500 });
        assert_eq!(locked.cash_redeemable, 300);

        let released = ledger.unlock("carol", 500, CurrencyMode::RedeemableCash).unwrap();
        assert_eq!(released.cash, SubAccount { available: 800, locked: 0 });
        assert_eq!(released.cash_redeemable, 800);

        assert!(ledger.unlock("carol", 1, CurrencyMode::RedeemableCash).is_err());
    }

    #[test]
    fn test_consume_locked_does_not_recredit() {
        let ledger = Ledger::new();
        ledger.transact("dave", |b| b.credit_redeemable(200)).unwrap();
        ledger.lock("dave", 200, CurrencyMode::RedeemableCash).unwrap();
        let after = ledger.consume_locked("dave", 200, CurrencyMode::RedeemableCash).unwrap();
        assert_eq!(after.cash, SubAccount::default());
    }

    #[test]
    fn test_cash_lock_limited_to_redeemable() {
        let ledger = Ledger::new();
        ledger.credit("erin", 1_000, CurrencyMode::RedeemableCash).unwrap();
        assert!(ledger.lock("erin", 10, CurrencyMode::RedeemableCash).is_err());

        ledger.release_redeemable("erin", 400).unwrap();
        assert!(ledger.lock("erin", 400, CurrencyMode::RedeemableCash).is_ok());
    }

    #[test]
    fn test_failed_transaction_leaves_balance_untouched() {
        let ledger = Ledger::new();
        ledger.credit("frank", 50, CurrencyMode::PlayCredits).unwrap();

        let result: Result<(), LedgerError> = ledger.transact("frank", |b| {
            b.credit(25, CurrencyMode::PlayCredits)?;
            b.debit(1_000, CurrencyMode::PlayCredits)
        });
        assert!(result.is_err());
        assert_eq!(ledger.balance("frank").play.available, 50);
    }

    #[test]
    fn test_bridge_moves_between_tracks() {
        let ledger = Ledger::new();
        ledger.credit("gina", 300, CurrencyMode::PlayCredits).unwrap();
        let after = ledger
            .bridge("gina", CurrencyMode::PlayCredits, CurrencyMode::RedeemableCash, 120)
            .unwrap();
        assert_eq!(after.play.available, 180);
        assert_eq!(after.cash.available, 120);
        assert_eq!(after.cash_redeemable, 0);
        assert!(ledger
            .bridge("gina", CurrencyMode::PlayCredits, CurrencyMode::PlayCredits, 1)
            .is_err());
    }

    #[test]
    fn test_settlement_delta_equals_profit() {
        let mut balance = Balance::new("hank");
        balance.credit(1_000, CurrencyMode::PlayCredits).unwrap();
        let delta = balance.apply_settlement(100, 250, CurrencyMode::PlayCredits).unwrap();
        assert_eq!(delta, 150);
        assert_eq!(balance.play.available, 1_150);
    }

    #[test]
    fn test_cash_winnings_are_withdrawable() {
        let ledger = Ledger::new();
        ledger.transact("jill", |b| b.credit_redeemable(100)).unwrap();

        let after = ledger
            .transact("jill", |b| {
                b.apply_settlement(100, 194, CurrencyMode::RedeemableCash)?;
                Ok::<_, LedgerError>(b.clone())
            })
            .unwrap();
        assert_eq!(after.cash.available, 194);
        assert_eq!(after.cash_redeemable, 194);
        assert!(ledger.lock("jill", 194, CurrencyMode::RedeemableCash).is_ok());
    }

    #[test]
    fn test_bridged_cash_stays_non_redeemable_until_wagered() {
        let ledger = Ledger::new();
        ledger.credit("kate", 100, CurrencyMode::PlayCredits).unwrap();
        ledger
            .bridge("kate", CurrencyMode::PlayCredits, CurrencyMode::RedeemableCash, 100)
            .unwrap();
        assert!(ledger.lock("kate", 1, CurrencyMode::RedeemableCash).is_err());

        // A losing bet pays nothing back.
        let after = ledger
            .transact("kate", |b| {
                b.apply_settlement(40, 0, CurrencyMode::RedeemableCash)?;
                Ok::<_, LedgerError>(b.clone())
            })
            .unwrap();
        assert_eq!(after.cash.available, 60);
        assert_eq!(after.cash_redeemable, 0);
    }

    #[test]
    fn test_try_transact_fails_fast_under_contention() {
        let ledger = Arc::new(Ledger::new());
        ledger.credit("liam", 100, CurrencyMode::PlayCredits).unwrap();

        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let holder = {
            let ledger = ledger.clone();
            std::thread::spawn(move || {
                ledger
                    .transact("liam", |_| {
                        held_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        Ok::<_, LedgerError>(())
                    })
                    .unwrap();
            })
        };
        held_rx.recv().unwrap();

        let err = ledger
            .try_transact("liam", |b| b.debit(10, CurrencyMode::PlayCredits))
            .unwrap_err();
        assert_eq!(err, LedgerError::Contention("liam".to_string()));

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        ledger
            .try_transact("liam", |b| b.debit(10, CurrencyMode::PlayCredits))
            .unwrap();
        assert_eq!(ledger.balance("liam").play.available, 90);
    }

    #[test]
    fn test_concurrent_debits_never_go_negative() {
        let ledger = Arc::new(Ledger::new());
        ledger.credit("ivy", 1_000, CurrencyMode::PlayCredits).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || ledger.debit("ivy", 100, CurrencyMode::PlayCredits).is_ok())
            })
            .collect();
        let successes = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();

        assert_eq!(successes, 10);
        assert_eq!(ledger.balance("ivy").play.available, 0);
    }
}
