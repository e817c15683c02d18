//! Coin flip. The side is taken from `sha256(server + client + round)` so a
//! player can check it with nothing more than a SHA-256 tool.

use crate::games::fair_rng::SeedContext;
use crate::games::types::{fair_multiplier, payout_for, CoinSide, GameData, GameType, SettledGame};

pub fn multiplier(rtp: f64) -> f64 {
    fair_multiplier(rtp, 1, 2)
}

pub fn settle(stake: u64, choice: CoinSide, rtp: f64, ctx: &SeedContext<'_>) -> SettledGame {
    let side = ctx.coin_side();
    let multiplier = multiplier(rtp);
    let payout = if side == choice { payout_for(stake, multiplier) } else { 0 };

    SettledGame::new(GameType::CoinFlip, GameData::CoinFlip { side }, stake, payout, multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinflip_deterministic() {
        let ctx = SeedContext::new("server", "client", 4);
        let first = settle(100, CoinSide::Heads, 0.98, &ctx);
        let second = settle(100, CoinSide::Heads, 0.98, &ctx);
        assert_eq!(first, second);
    }

    #[test]
    fn test_coinflip_payout() {
        let ctx = SeedContext::new("server", "client", 9);
        let side = ctx.coin_side();
        let won = settle(100, side, 0.98, &ctx);
        assert_eq!(won.payout, 196);
        assert_eq!(won.profit, 96);

        let other = if side == CoinSide::Heads { CoinSide::Tails } else { CoinSide::Heads };
        let lost = settle(100, other, 0.98, &ctx);
        assert_eq!(lost.payout, 0);
        assert_eq!(lost.profit, -100);
    }
}
