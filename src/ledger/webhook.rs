//! Payment processor webhooks
//!
//! Signature checking runs before anything else looks at the body. The payload
//! is only parsed once the signature over the raw bytes has been accepted.

use crate::errors::PaymentError;
use crate::ledger::TransactionStatus;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 signer/verifier for webhook bodies.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length")
    }

    /// Lowercase hex signature for `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a hex signature against `body`.
    pub fn verify(&self, body: &[u8], signature: &str) -> Result<(), PaymentError> {
        if self.secret.is_empty() {
            return Err(PaymentError::SignatureVerification);
        }
        let expected = hex::decode(signature.trim()).map_err(|_| PaymentError::SignatureVerification)?;
        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| PaymentError::SignatureVerification)
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

/// Notification body sent by the payment processor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub payment_id: String,
    pub status: String,
    #[serde(default)]
    pub paid_amount: Option<u64>,
    pub order_id: String,
}

impl WebhookPayload {
    pub fn parse(raw: &[u8]) -> Result<Self, PaymentError> {
        serde_json::from_slice(raw).map_err(|e| PaymentError::MalformedPayload(e.to_string()))
    }

    /// Processor status mapped onto the internal lifecycle.
    pub fn internal_status(&self) -> Result<TransactionStatus, PaymentError> {
        map_processor_status(&self.status)
    }
}

pub fn map_processor_status(status: &str) -> Result<TransactionStatus, PaymentError> {
    match status.to_ascii_lowercase().as_str() {
        "waiting" | "confirming" | "sending" | "partially_paid" => Ok(TransactionStatus::Pending),
        "confirmed" | "finished" => Ok(TransactionStatus::Confirmed),
        "failed" | "refunded" => Ok(TransactionStatus::Failed),
        "expired" => Ok(TransactionStatus::Expired),
        other => Err(PaymentError::UnknownStatus(other.to_string())),
    }
}
