//! Single-zero roulette.

use crate::errors::ValidationError;
use crate::games::fair_rng::{SeedContext, ROULETTE_POCKETS};
use crate::games::types::{fair_multiplier, payout_for, GameData, GameType, RouletteBet, RouletteColor, SettledGame};

const RED_POCKETS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

pub fn color_of(pocket: u8) -> RouletteColor {
    if pocket == 0 {
        RouletteColor::Green
    } else if RED_POCKETS.contains(&pocket) {
        RouletteColor::Red
    } else {
        RouletteColor::Black
    }
}

pub fn covers(bet: RouletteBet, pocket: u8) -> bool {
    if pocket == 0 {
        return bet == RouletteBet::Straight(0);
    }
    match bet {
        RouletteBet::Straight(n) => n == pocket,
        RouletteBet::Red => color_of(pocket) == RouletteColor::Red,
        RouletteBet::Black => color_of(pocket) == RouletteColor::Black,
        RouletteBet::Odd => pocket % 2 == 1,
        RouletteBet::Even => pocket % 2 == 0,
        RouletteBet::Low => pocket <= 18,
        RouletteBet::High => pocket >= 19,
        RouletteBet::Dozen(d) => (pocket - 1) / 12 + 1 == d,
        RouletteBet::Column(c) => (pocket - 1) % 3 + 1 == c,
    }
}

pub fn validate(bet: RouletteBet) -> Result<(), ValidationError> {
    match bet {
        RouletteBet::Straight(n) if n > 36 => Err(ValidationError::invalid("bet", "straight number must be 0..=36")),
        RouletteBet::Dozen(d) if !(1..=3).contains(&d) => Err(ValidationError::invalid("bet", "dozen must be 1..=3")),
        RouletteBet::Column(c) if !(1..=3).contains(&c) => Err(ValidationError::invalid("bet", "column must be 1..=3")),
        _ => Ok(()),
    }
}

pub fn winning_pockets(bet: RouletteBet) -> u64 {
    (0..ROULETTE_POCKETS as u8).filter(|&p| covers(bet, p)).count() as u64
}

pub fn settle(stake: u64, bet: RouletteBet, rtp: f64, ctx: &SeedContext<'_>) -> SettledGame {
    let pocket = ctx.roulette_pocket();
    let multiplier = fair_multiplier(rtp, winning_pockets(bet), ROULETTE_POCKETS);
    let payout = if covers(bet, pocket) { payout_for(stake, multiplier) } else { 0 };

    SettledGame::new(
        GameType::Roulette,
        GameData::Roulette {
            pocket,
            color: color_of(pocket),
        },
        stake,
        payout,
        multiplier,
    )
}
