//! Seeded price walk
//!
//! The price path of a round is fully determined by its server seed and round
//! id, so once the seed is revealed anyone can replay every tick.

use crate::config::CoasterConfig;
use crate::fairness::generate_server_seed;
use crate::games::fair_rng::{hash_seed, normal_sample};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rounds are calendar days in UTC.
pub fn round_id_for(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Walk parameters, copied out of the config so the walk can be replayed alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WalkParams {
    pub baseline_price: f64,
    pub min_price: f64,
    pub drift: f64,
    pub volatility: f64,
    pub dt: f64,
    pub smoothing_prior_weight: f64,
}

impl From<&CoasterConfig> for WalkParams {
    fn from(config: &CoasterConfig) -> Self {
        Self {
            baseline_price: config.baseline_price,
            min_price: config.min_price,
            drift: config.drift,
            volatility: config.volatility,
            dt: config.dt,
            smoothing_prior_weight: config.smoothing_prior_weight,
        }
    }
}

#[derive(Clone)]
pub struct PriceWalk {
    pub round_id: String,
    server_seed: String,
    pub server_seed_hash: String,
    pub price: f64,
    pub tick_index: u64,
    prev_sample: f64,
    params: WalkParams,
}

impl PriceWalk {
    pub fn new(round_id: String, server_seed: String, params: WalkParams) -> Self {
        Self {
            round_id,
            server_seed_hash: hash_seed(&server_seed),
            server_seed,
            price: params.baseline_price,
            tick_index: 0,
            prev_sample: 0.0,
            params,
        }
    }

    /// Fresh round with a newly generated seed.
    pub fn start(round_id: String, params: WalkParams) -> Self {
        Self::new(round_id, generate_server_seed(), params)
    }

    pub fn server_seed(&self) -> &str {
        &self.server_seed
    }

    /// Advance one tick and return the new price.
    pub fn step(&mut self) -> f64 {
        self.tick_index += 1;
        let z = normal_sample(&self.server_seed, &self.round_id, self.tick_index);
        let w = self.params.smoothing_prior_weight;
        let smoothed = w * self.prev_sample + (1.0 - w) * z;
        self.prev_sample = smoothed;

        let p = &self.params;
        let exponent = p.drift * p.dt + p.volatility * p.dt.sqrt() * smoothed;
        self.price = (self.price * exponent.exp()).max(p.min_price);
        self.price
    }

    #[cfg(test)]
    pub(crate) fn set_price(&mut self, price: f64) {
        self.price = price;
    }
}

/// Prices after ticks `1..=ticks` of a round.
pub fn replay_prices(server_seed: &str, round_id: &str, ticks: u64, params: WalkParams) -> Vec<f64> {
    let mut walk = PriceWalk::new(round_id.to_string(), server_seed.to_string(), params);
    (0..ticks).map(|_| walk.step()).collect()
}
