//! Commit-reveal seed management
//!
//! Each user has one active [`SeedPair`]. Only the hash of its server seed is
//! published until the pair is rotated, at which point the seed is revealed
//! and archived so past bets can be verified. Pairs live behind per-user async
//! mutexes; a bet holds its user's lock from the commitment check until the
//! nonce has advanced.

use crate::{
    config::FairnessConfig,
    errors::{FairnessError, ValidationError, WagerResult},
    games::fair_rng::{hash_seed, SeedContext},
    store::SeedRevealRepository,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

const SERVER_SEED_BYTES: usize = 32;
const CLIENT_SEED_BYTES: usize = 16;

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn generate_server_seed() -> String {
    random_hex(SERVER_SEED_BYTES)
}

pub fn generate_client_seed() -> String {
    random_hex(CLIENT_SEED_BYTES)
}

/// Public view of the active seed pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commitment {
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

/// A retired server seed, published for verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedReveal {
    pub server_seed: String,
    pub server_seed_hash: String,
    pub client_seed: String,
    /// Nonce the next bet would have used; bets `0..final_nonce` ran under this seed.
    pub final_nonce: u64,
    pub revealed_at: DateTime<Utc>,
}

impl SeedReveal {
    pub fn is_consistent(&self) -> bool {
        hash_seed(&self.server_seed) == self.server_seed_hash
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RotationOutcome {
    pub revealed: SeedReveal,
    pub next: Commitment,
}

/// Active server/client seed pair for one user.
#[derive(Clone)]
pub struct SeedPair {
    server_seed: String,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

impl SeedPair {
    pub fn generate(client_seed: String) -> Self {
        Self::from_parts(generate_server_seed(), client_seed, 0)
    }

    /// Rebuild a pair from known material, e.g. when restoring state.
    pub fn from_parts(server_seed: String, client_seed: String, nonce: u64) -> Self {
        Self {
            server_seed_hash: hash_seed(&server_seed),
            server_seed,
            client_seed,
            nonce,
        }
    }

    pub fn commitment(&self) -> Commitment {
        Commitment {
            server_seed_hash: self.server_seed_hash.clone(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        }
    }

    /// The caller must be betting against exactly the current commitment.
    pub fn check(&self, client_seed: &str, nonce: u64) -> Result<(), FairnessError> {
        if client_seed != self.client_seed || nonce != self.nonce {
            return Err(FairnessError::StaleCommitment {
                expected_nonce: self.nonce,
                provided_nonce: nonce,
            });
        }
        Ok(())
    }

    pub fn context(&self) -> SeedContext<'_> {
        SeedContext::new(&self.server_seed, &self.client_seed, self.nonce)
    }

    fn reveal(&self) -> SeedReveal {
        SeedReveal {
            server_seed: self.server_seed.clone(),
            server_seed_hash: self.server_seed_hash.clone(),
            client_seed: self.client_seed.clone(),
            final_nonce: self.nonce,
            revealed_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for SeedPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedPair")
            .field("server_seed_hash", &self.server_seed_hash)
            .field("client_seed", &self.client_seed)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

pub struct FairnessManager {
    config: FairnessConfig,
    seeds: DashMap<String, Arc<Mutex<SeedPair>>>,
    reveals: Arc<dyn SeedRevealRepository>,
}

impl FairnessManager {
    pub fn new(config: FairnessConfig, reveals: Arc<dyn SeedRevealRepository>) -> Self {
        Self {
            config,
            seeds: DashMap::new(),
            reveals,
        }
    }

    fn slot(&self, user_id: &str) -> Arc<Mutex<SeedPair>> {
        self.seeds
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "Generated initial seed pair");
                Arc::new(Mutex::new(SeedPair::generate(generate_client_seed())))
            })
            .clone()
    }

    /// Replace a user's active pair outright.
    pub fn install(&self, user_id: &str, pair: SeedPair) {
        self.seeds.insert(user_id.to_string(), Arc::new(Mutex::new(pair)));
    }

    pub async fn get_commitment(&self, user_id: &str) -> Commitment {
        self.slot(user_id).lock().await.commitment()
    }

    /// Exclusive access to the user's pair for the duration of one bet.
    pub async fn lock(&self, user_id: &str) -> OwnedMutexGuard<SeedPair> {
        self.slot(user_id).lock_owned().await
    }

    pub async fn rotate(&self, user_id: &str) -> WagerResult<RotationOutcome> {
        let mut pair = self.lock(user_id).await;
        let client_seed = pair.client_seed.clone();
        self.rotate_locked(user_id, &mut pair, client_seed)
    }

    /// New client seed; always retires the current server seed with it.
    pub async fn set_client_seed(&self, user_id: &str, client_seed: &str) -> WagerResult<RotationOutcome> {
        let trimmed = client_seed.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::invalid("client_seed", "must not be empty").into());
        }
        if trimmed.len() > self.config.max_client_seed_len {
            return Err(ValidationError::invalid(
                "client_seed",
                format!("longer than {} characters", self.config.max_client_seed_len),
            )
            .into());
        }
        let mut pair = self.lock(user_id).await;
        self.rotate_locked(user_id, &mut pair, trimmed.to_string())
    }

    fn rotate_locked(&self, user_id: &str, pair: &mut SeedPair, client_seed: String) -> WagerResult<RotationOutcome> {
        let revealed = pair.reveal();
        self.reveals.archive_reveal(&revealed)?;
        *pair = SeedPair::generate(client_seed);
        info!(
            user_id,
            revealed_hash = %revealed.server_seed_hash,
            next_hash = %pair.server_seed_hash,
            final_nonce = revealed.final_nonce,
            "Rotated server seed"
        );
        Ok(RotationOutcome {
            revealed,
            next: pair.commitment(),
        })
    }

    /// Advance past a settled bet, rotating once the seed has served
    /// `rotate_after` bets. The bet is already committed, so a failed rotation
    /// is logged and the pair keeps its advanced nonce.
    pub fn finish_bet(&self, user_id: &str, pair: &mut SeedPair) -> Option<SeedReveal> {
        pair.nonce += 1;
        if pair.nonce < self.config.rotate_after {
            return None;
        }
        let client_seed = pair.client_seed.clone();
        match self.rotate_locked(user_id, pair, client_seed) {
            Ok(outcome) => Some(outcome.revealed),
            Err(e) => {
                warn!(user_id, error = %e, "Automatic seed rotation failed");
                None
            }
        }
    }

    pub fn reveal_by_hash(&self, server_seed_hash: &str) -> WagerResult<SeedReveal> {
        self.reveals
            .reveal_by_hash(server_seed_hash)
            .ok_or_else(|| FairnessError::RevealNotFound(server_seed_hash.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WagerError;
    use crate::store::MemoryStore;

    fn manager(rotate_after: u64) -> FairnessManager {
        let config = FairnessConfig {
            rotate_after,
            ..FairnessConfig::default()
        };
        FairnessManager::new(config, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_generated_seed_lengths() {
        assert_eq!(generate_server_seed().len(), 64);
        assert_eq!(generate_client_seed().len(), 32);
        assert_ne!(generate_server_seed(), generate_server_seed());
    }

    #[test]
    fn test_stale_commitment_detected() {
        let pair = SeedPair::from_parts("server".into(), "abc".into(), 4);
        assert!(pair.check("abc", 4).is_ok());
        assert_eq!(
            pair.check("abc", 3),
            Err(FairnessError::StaleCommitment {
                expected_nonce: 4,
                provided_nonce: 3
            })
        );
        assert!(pair.check("abd", 4).is_err());
    }

    #[test]
    fn test_debug_hides_server_seed() {
        let pair = SeedPair::from_parts("very-secret".into(), "abc".into(), 0);
        assert!(!format!("{:?}", pair).contains("very-secret"));
    }

    #[tokio::test]
    async fn test_rotation_reveals_committed_seed() {
        let manager = manager(100);
        let before = manager.get_commitment("alice").await;

        let outcome = manager.rotate("alice").await.unwrap();
        assert_eq!(outcome.revealed.server_seed_hash, before.server_seed_hash);
        assert!(outcome.revealed.is_consistent());
        assert_ne!(outcome.next.server_seed_hash, before.server_seed_hash);
        assert_eq!(outcome.next.nonce, 0);
        assert_eq!(outcome.next.client_seed, before.client_seed);

        let archived = manager.reveal_by_hash(&before.server_seed_hash).unwrap();
        assert_eq!(archived, outcome.revealed);
    }

    #[tokio::test]
    async fn test_set_client_seed_rotates() {
        let manager = manager(100);
        let before = manager.get_commitment("bob").await;

        let outcome = manager.set_client_seed("bob", "lucky").await.unwrap();
        assert_eq!(outcome.revealed.client_seed, before.client_seed);
        assert_eq!(outcome.next.client_seed, "lucky");
        assert_ne!(outcome.next.server_seed_hash, before.server_seed_hash);

        let err = manager.set_client_seed("bob", "   ").await.unwrap_err();
        assert!(matches!(err, WagerError::Validation(_)));
        let err = manager.set_client_seed("bob", &"x".repeat(65)).await.unwrap_err();
        assert!(matches!(err, WagerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_finish_bet_auto_rotates() {
        let manager = manager(2);
        let first_hash = manager.get_commitment("carol").await.server_seed_hash;

        let mut pair = manager.lock("carol").await;
        assert!(manager.finish_bet("carol", &mut pair).is_none());
        assert_eq!(pair.nonce, 1);

        let revealed = manager.finish_bet("carol", &mut pair).unwrap();
        assert_eq!(revealed.server_seed_hash, first_hash);
        assert_eq!(revealed.final_nonce, 2);
        assert_eq!(pair.nonce, 0);
        assert_ne!(pair.server_seed_hash, first_hash);
    }

    #[tokio::test]
    async fn test_unknown_reveal() {
        let manager = manager(10);
        assert!(matches!(
            manager.reveal_by_hash("nope"),
            Err(WagerError::Fairness(FairnessError::RevealNotFound(_)))
        ));
    }
}
