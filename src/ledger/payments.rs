//! Deposits, withdrawals and the webhook pipeline
//!
//! `handle_webhook` runs three separate stages: the signature check on the raw
//! body, the idempotency check against the stored status, and the pure ledger
//! update in [`apply_terminal`]. The status compare-and-set runs inside the
//! ledger transaction, so whichever delivery wins the CAS is the only one
//! whose balance change commits.

use crate::{
    config::PaymentsConfig,
    errors::{LedgerError, PaymentError, ValidationError, WagerError, WagerResult},
    ledger::{webhook::WebhookPayload, Balance, CurrencyMode, Ledger, WebhookVerifier},
    store::TransactionRepository,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
    Expired,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// One deposit or withdrawal tracked against the external processor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CryptoTransaction {
    pub id: String,
    pub user_id: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: u64,
    pub paid_amount: Option<u64>,
    pub currency_mode: CurrencyMode,
    pub external_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CryptoTransaction {
    pub fn new(user_id: &str, kind: TransactionKind, amount: u64, currency_mode: CurrencyMode) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            status: TransactionStatus::Pending,
            amount,
            paid_amount: None,
            currency_mode,
            external_payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// What the caller should report back to the processor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookAck {
    pub tx_id: String,
    pub status: TransactionStatus,
    /// False for pending updates that moved no money.
    pub applied: bool,
}

/// Ledger effect of a transaction reaching `status`.
pub fn apply_terminal(
    balance: &mut Balance,
    tx: &CryptoTransaction,
    status: TransactionStatus,
    paid_amount: Option<u64>,
) -> Result<(), LedgerError> {
    match (tx.kind, status) {
        (TransactionKind::Deposit, TransactionStatus::Confirmed) => {
            let amount = paid_amount.filter(|paid| *paid > 0).unwrap_or(tx.amount);
            balance.credit_redeemable(amount)
        }
        (TransactionKind::Withdrawal, TransactionStatus::Confirmed) => {
            balance.consume_locked(tx.amount, tx.currency_mode)
        }
        (TransactionKind::Withdrawal, TransactionStatus::Failed | TransactionStatus::Expired) => {
            balance.unlock(tx.amount, tx.currency_mode)
        }
        (TransactionKind::Deposit, _) | (_, TransactionStatus::Pending) => Ok(()),
    }
}

pub struct PaymentService {
    config: PaymentsConfig,
    ledger: Arc<Ledger>,
    transactions: Arc<dyn TransactionRepository>,
    verifier: WebhookVerifier,
}

impl PaymentService {
    pub fn new(config: PaymentsConfig, ledger: Arc<Ledger>, transactions: Arc<dyn TransactionRepository>) -> Self {
        let verifier = WebhookVerifier::new(&config.webhook_secret);
        Self {
            config,
            ledger,
            transactions,
            verifier,
        }
    }

    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    fn ensure_enabled(&self) -> Result<(), PaymentError> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(PaymentError::Disabled)
        }
    }

    /// Record a pending deposit. Nothing is credited until the processor confirms.
    pub fn create_deposit(&self, user_id: &str, amount: u64) -> WagerResult<CryptoTransaction> {
        self.ensure_enabled()?;
        if amount == 0 {
            return Err(LedgerError::ZeroAmount.into());
        }
        let tx = CryptoTransaction::new(user_id, TransactionKind::Deposit, amount, CurrencyMode::RedeemableCash);
        self.transactions.insert_transaction(&tx)?;
        info!(user_id, tx_id = %tx.id, amount, "Created deposit");
        Ok(tx)
    }

    /// Hold redeemable cash for a payout. The hold and the transaction record
    /// are written together.
    pub fn request_withdrawal(&self, user_id: &str, amount: u64) -> WagerResult<CryptoTransaction> {
        self.ensure_enabled()?;
        if amount < self.config.min_withdrawal {
            return Err(ValidationError::invalid(
                "amount",
                format!("withdrawals start at {}", self.config.min_withdrawal),
            )
            .into());
        }
        let tx = CryptoTransaction::new(user_id, TransactionKind::Withdrawal, amount, CurrencyMode::RedeemableCash);
        self.ledger.transact(user_id, |balance| {
            balance.lock(amount, CurrencyMode::RedeemableCash)?;
            self.transactions.insert_transaction(&tx)?;
            Ok::<_, WagerError>(())
        })?;
        info!(user_id, tx_id = %tx.id, amount, "Withdrawal requested, funds locked");
        Ok(tx)
    }

    pub fn transaction(&self, tx_id: &str) -> Option<CryptoTransaction> {
        self.transactions.get_transaction(tx_id)
    }

    /// Authenticate, deduplicate and apply one processor notification.
    pub fn handle_webhook(&self, raw_body: &[u8], signature: &str) -> WagerResult<WebhookAck> {
        if let Err(e) = self.verifier.verify(raw_body, signature) {
            warn!("Rejected webhook with bad signature");
            return Err(e.into());
        }

        let payload = WebhookPayload::parse(raw_body)?;
        let status = payload.internal_status()?;
        let tx = self
            .transactions
            .get_transaction(&payload.order_id)
            .ok_or_else(|| PaymentError::UnknownTransaction(payload.order_id.clone()))?;

        if tx.status.is_terminal() {
            info!(tx_id = %tx.id, payment_id = %payload.payment_id, "Webhook for settled transaction ignored");
            return Err(PaymentError::AlreadyProcessed(tx.id).into());
        }

        if !status.is_terminal() {
            return Ok(WebhookAck {
                tx_id: tx.id,
                status,
                applied: false,
            });
        }

        self.ledger.transact(&tx.user_id, |balance| -> WagerResult<()> {
            apply_terminal(balance, &tx, status, payload.paid_amount)?;
            let won = self.transactions.compare_and_set_status(
                &tx.id,
                TransactionStatus::Pending,
                status,
                Some(payload.payment_id.as_str()),
                payload.paid_amount,
            )?;
            if !won {
                return Err(PaymentError::AlreadyProcessed(tx.id.clone()).into());
            }
            Ok(())
        })?;

        info!(
            tx_id = %tx.id,
            user_id = %tx.user_id,
            payment_id = %payload.payment_id,
            ?status,
            "Applied terminal payment status"
        );
        Ok(WebhookAck {
            tx_id: tx.id,
            status,
            applied: true,
        })
    }
}
