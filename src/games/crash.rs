//! Crash with an auto-cashout target. The house edge lives in the crash point
//! distribution, so the payout is simply `stake * target` when the round
//! reaches the target.

use crate::errors::ValidationError;
use crate::games::fair_rng::SeedContext;
use crate::games::types::{payout_for, GameData, GameType, SettledGame};

pub const MIN_TARGET: f64 = 1.01;
pub const MAX_TARGET: f64 = 1_000_000.0;

pub fn validate(target_multiplier: f64) -> Result<(), ValidationError> {
    if !target_multiplier.is_finite() || !(MIN_TARGET..=MAX_TARGET).contains(&target_multiplier) {
        return Err(ValidationError::invalid(
            "target_multiplier",
            format!("must be between {} and {}", MIN_TARGET, MAX_TARGET),
        ));
    }
    Ok(())
}

pub fn settle(stake: u64, target_multiplier: f64, rtp: f64, ctx: &SeedContext<'_>) -> SettledGame {
    let crash_point = ctx.crash_point(1.0 - rtp);
    let payout = if crash_point >= target_multiplier {
        payout_for(stake, target_multiplier)
    } else {
        0
    };

    SettledGame::new(GameType::Crash, GameData::Crash { crash_point }, stake, payout, target_multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_target() {
        assert!(validate(1.0).is_err());
        assert!(validate(f64::NAN).is_err());
        assert!(validate(2.0).is_ok());
    }

    #[test]
    fn test_settle_matches_crash_point() {
        for nonce in 0..100 {
            let ctx = SeedContext::new("server", "client", nonce);
            let game = settle(100, 2.0, 0.97, &ctx);
            let GameData::Crash { crash_point } = game.data else {
                panic!("expected crash data");
            };
            assert!(crash_point >= 1.0);
            assert_eq!(game.payout == 200, crash_point >= 2.0);
        }
    }
}
