//! Deterministic outcome derivation
//!
//! Every outcome in the system is a pure function of
//! `(server_seed, client_seed, nonce, sub_index)`: an HMAC-SHA256 keyed by the
//! server seed over `client_seed:nonce:sub_index`. The leading eight bytes of
//! the digest are read big-endian and either normalised to `[0, 1)` or reduced
//! modulo the size of the game's outcome domain. Anyone holding the revealed
//! server seed can rerun these functions and get the same result.

use crate::games::types::{CoinSide, DicePair};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub type HmacSha256 = Hmac<Sha256>;

/// Number of equally likely ordered pairs of two six-sided dice
pub const DICE_COMBINATIONS: u64 = 36;
/// Pockets on a single-zero wheel
pub const ROULETTE_POCKETS: u64 = 37;

/// Public commitment for a server seed.
pub fn hash_seed(server_seed: &str) -> String {
    hex::encode(Sha256::digest(server_seed.as_bytes()))
}

/// Raw keyed digest for one sub-element of one bet.
pub fn derive(server_seed: &str, client_seed: &str, nonce: u64, sub_index: u32) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(server_seed.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}:{}:{}", client_seed, nonce, sub_index).as_bytes());
    mac.finalize().into_bytes().into()
}

fn leading_u64(digest: &[u8; 32]) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Uniform float in `[0, 1)` built from the top 53 bits of the digest.
pub fn unit_from_digest(digest: &[u8; 32]) -> f64 {
    (leading_u64(digest) >> 11) as f64 / (1u64 << 53) as f64
}

/// Integer in `0..modulus`.
pub fn reduce_digest(digest: &[u8; 32], modulus: u64) -> u64 {
    leading_u64(digest) % modulus.max(1)
}

/// Borrowed view of the commitment a bet is settled under.
#[derive(Debug, Clone, Copy)]
pub struct SeedContext<'a> {
    pub server_seed: &'a str,
    pub client_seed: &'a str,
    pub nonce: u64,
}

impl<'a> SeedContext<'a> {
    pub fn new(server_seed: &'a str, client_seed: &'a str, nonce: u64) -> Self {
        Self {
            server_seed,
            client_seed,
            nonce,
        }
    }

    pub fn digest(&self, sub_index: u32) -> [u8; 32] {
        derive(self.server_seed, self.client_seed, self.nonce, sub_index)
    }

    pub fn unit(&self, sub_index: u32) -> f64 {
        unit_from_digest(&self.digest(sub_index))
    }

    pub fn reduce(&self, sub_index: u32, modulus: u64) -> u64 {
        reduce_digest(&self.digest(sub_index), modulus)
    }

    /// One of the 36 equally likely `(a, b)` dice pairs.
    pub fn dice_pair(&self) -> DicePair {
        let index = self.reduce(0, DICE_COMBINATIONS) as u8;
        DicePair {
            a: index / 6 + 1,
            b: index % 6 + 1,
        }
    }

    /// Coin side using the nonce as the round identifier.
    pub fn coin_side(&self) -> CoinSide {
        coin_side(self.server_seed, self.client_seed, &self.nonce.to_string())
    }

    /// Symbol index per cell, laid out `grid[reel][row]`.
    pub fn slot_grid(&self, reels: usize, rows: usize, symbol_count: usize) -> Vec<Vec<usize>> {
        (0..reels)
            .map(|reel| {
                (0..rows)
                    .map(|row| {
                        let cell = (reel * rows + row) as u32;
                        self.reduce(cell, symbol_count as u64) as usize
                    })
                    .collect()
            })
            .collect()
    }

    pub fn roulette_pocket(&self) -> u8 {
        self.reduce(0, ROULETTE_POCKETS) as u8
    }

    pub fn crash_point(&self, edge: f64) -> f64 {
        crash_point_from_unit(self.unit(0), edge)
    }
}

/// `sha256(server_seed + client_seed + round_id)`; parity of the first hex
/// nibble picks the side (even is heads).
pub fn coin_side(server_seed: &str, client_seed: &str, round_id: &str) -> CoinSide {
    let digest = Sha256::digest(format!("{}{}{}", server_seed, client_seed, round_id).as_bytes());
    let first_nibble = digest[0] >> 4;
    if first_nibble % 2 == 0 {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

/// `max(1, (1 - edge) / u)` floored to two decimals, with `u` kept inside `(0, 1)`.
pub fn crash_point_from_unit(unit: f64, edge: f64) -> f64 {
    let u = unit.max(f64::EPSILON);
    let raw = (1.0 - edge) / u;
    ((raw * 100.0).floor() / 100.0).max(1.0)
}

/// Unit-normal sample for one Coaster tick, from two uniforms via Box-Muller.
pub fn normal_sample(round_seed: &str, round_id: &str, tick_index: u64) -> f64 {
    let ctx = SeedContext::new(round_seed, round_id, tick_index);
    let u1 = ctx.unit(0).max(f64::EPSILON);
    let u2 = ctx.unit(1);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
