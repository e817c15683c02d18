use crate::config::GamesConfig;
use crate::errors::{ValidationError, WagerResult};
use crate::fairness::SeedPair;
use crate::games::fair_rng::SeedContext;
use crate::games::types::{GameParams, SettledGame};
use crate::games::{coinflip, crash, dice, roulette, slots};

/// Dispatches a bet to its settlement module
pub struct GameProcessor {
    rules: GamesConfig,
}

impl GameProcessor {
    pub fn new(rules: GamesConfig) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &GamesConfig {
        &self.rules
    }

    /// Reject bad stakes and parameters before any randomness is derived
    pub fn validate(&self, stake: u64, params: &GameParams) -> Result<(), ValidationError> {
        if stake < self.rules.min_stake || stake > self.rules.max_stake {
            return Err(ValidationError::StakeOutOfRange {
                stake,
                min: self.rules.min_stake,
                max: self.rules.max_stake,
            });
        }
        match params {
            GameParams::Dice { target, direction } => dice::validate(*target, *direction),
            GameParams::Roulette { bet } => roulette::validate(*bet),
            GameParams::Crash { target_multiplier } => crash::validate(*target_multiplier),
            GameParams::CoinFlip { .. } | GameParams::Slots => Ok(()),
        }
    }

    /// Validate, check the caller's commitment, then compute the outcome
    pub fn settle(
        &self,
        stake: u64,
        params: &GameParams,
        client_seed: &str,
        nonce: u64,
        pair: &SeedPair,
    ) -> WagerResult<SettledGame> {
        self.validate(stake, params)?;
        pair.check(client_seed, nonce)?;
        Ok(self.replay(stake, params, &pair.context()))
    }

    /// Pure outcome computation. Used for settlement and for verification
    /// once the server seed is revealed.
    pub fn replay(&self, stake: u64, params: &GameParams, ctx: &SeedContext<'_>) -> SettledGame {
        let rtp = self.rules.rtp;
        match params {
            GameParams::Dice { target, direction } => dice::settle(stake, *target, *direction, rtp, ctx),
            GameParams::CoinFlip { choice } => coinflip::settle(stake, *choice, rtp, ctx),
            GameParams::Slots => slots::settle(stake, rtp, &self.rules.slots, ctx),
            GameParams::Roulette { bet } => roulette::settle(stake, *bet, rtp, ctx),
            GameParams::Crash { target_multiplier } => crash::settle(stake, *target_multiplier, rtp, ctx),
        }
    }
}
