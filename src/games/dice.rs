//! Two-dice pair game: the bet wins when the pair's sum lands strictly under
//! or over the chosen target.

use crate::errors::ValidationError;
use crate::games::fair_rng::{SeedContext, DICE_COMBINATIONS};
use crate::games::types::{fair_multiplier, payout_for, DiceDirection, DicePair, GameData, GameType, SettledGame};

/// All 36 ordered pairs, in the same order `SeedContext::dice_pair` indexes them.
fn all_pairs() -> impl Iterator<Item = DicePair> {
    (0..DICE_COMBINATIONS as u8).map(|i| DicePair { a: i / 6 + 1, b: i % 6 + 1 })
}

fn wins(pair: DicePair, target: u8, direction: DiceDirection) -> bool {
    match direction {
        DiceDirection::Under => pair.sum() < target,
        DiceDirection::Over => pair.sum() > target,
    }
}

pub fn winning_combinations(target: u8, direction: DiceDirection) -> u64 {
    all_pairs().filter(|p| wins(*p, target, direction)).count() as u64
}

pub fn validate(target: u8, direction: DiceDirection) -> Result<(), ValidationError> {
    if !(2..=12).contains(&target) {
        return Err(ValidationError::invalid("target", "must be between 2 and 12"));
    }
    match winning_combinations(target, direction) {
        0 => Err(ValidationError::NoWinningOutcome { field: "target".to_string() }),
        DICE_COMBINATIONS => Err(ValidationError::NoLosingOutcome { field: "target".to_string() }),
        _ => Ok(()),
    }
}

pub fn multiplier(rtp: f64, target: u8, direction: DiceDirection) -> f64 {
    fair_multiplier(rtp, winning_combinations(target, direction), DICE_COMBINATIONS)
}

pub fn settle(stake: u64, target: u8, direction: DiceDirection, rtp: f64, ctx: &SeedContext<'_>) -> SettledGame {
    let pair = ctx.dice_pair();
    let multiplier = multiplier(rtp, target, direction);
    let payout = if wins(pair, target, direction) {
        payout_for(stake, multiplier)
    } else {
        0
    };

    SettledGame::new(
        GameType::Dice,
        GameData::Dice { pair, sum: pair.sum() },
        stake,
        payout,
        multiplier,
    )
}
