//! Error types for the wagerhouse settlement core
//!
//! Each concern owns a typed error; `WagerError` collects them so the
//! orchestrator can abort a bet as one unit and callers can match on the cause.

use crate::ledger::CurrencyMode;

/// Root error type for all settlement operations
#[derive(Debug, thiserror::Error)]
pub enum WagerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Fairness error: {0}")]
    Fairness(#[from] FairnessError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Coaster error: {0}")]
    Coaster(#[from] CoasterError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Bad stake or parameter. Raised before any randomness is consumed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Stake {stake} outside allowed range {min}..={max}")]
    StakeOutOfRange { stake: u64, min: u64, max: u64 },

    #[error("Invalid value for {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Parameter {field} leaves no winning outcome")]
    NoWinningOutcome { field: String },

    #[error("Parameter {field} leaves no losing outcome")]
    NoLosingOutcome { field: String },
}

impl ValidationError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FairnessError {
    /// Caller's client seed or nonce no longer matches the server commitment.
    #[error("Stale commitment: expected nonce {expected_nonce}, got {provided_nonce}")]
    StaleCommitment {
        expected_nonce: u64,
        provided_nonce: u64,
    },

    #[error("Revealed seed does not hash to the published commitment")]
    CommitmentMismatch,

    #[error("No revealed seed found for hash {0}")]
    RevealNotFound(String),

    #[error("Recomputed outcome differs from record {0}")]
    OutcomeMismatch(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient {mode} funds: requested {requested}, available {available}")]
    InsufficientFunds {
        mode: CurrencyMode,
        requested: u64,
        available: u64,
    },

    #[error("Insufficient locked {mode} funds: requested {requested}, locked {locked}")]
    InsufficientLocked {
        mode: CurrencyMode,
        requested: u64,
        locked: u64,
    },

    #[error("Balance overflow for user {0}")]
    Overflow(String),

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Cannot bridge {0} into itself")]
    SameTrack(CurrencyMode),

    #[error("Balance for user {0} is held by another operation")]
    Contention(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoasterError {
    #[error("User {0} already holds an open position")]
    DuplicatePosition(String),

    #[error("User {0} has no open position")]
    NoOpenPosition(String),

    #[error("Coaster is disabled")]
    Disabled,

    #[error("Coaster engine stopped")]
    EngineStopped,

    #[error("Coaster engine is busy, retry shortly")]
    Busy,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    #[error("Webhook signature verification failed")]
    SignatureVerification,

    /// Terminal status already applied; acknowledged without any state change.
    #[error("Transaction {0} already processed")]
    AlreadyProcessed(String),

    #[error("Unknown transaction for order {0}")]
    UnknownTransaction(String),

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("Unknown payment status: {0}")]
    UnknownStatus(String),

    #[error("Payments are disabled")]
    Disabled,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

impl WagerError {
    /// Safe to retry after refreshing the commitment or backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WagerError::Fairness(FairnessError::StaleCommitment { .. })
                | WagerError::Ledger(LedgerError::Contention(_))
                | WagerError::Coaster(CoasterError::Busy)
        )
    }

    /// Idempotent no-op that should still be acknowledged to the external caller.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, WagerError::Payment(PaymentError::AlreadyProcessed(_)))
    }
}

pub type WagerResult<T> = Result<T, WagerError>;
