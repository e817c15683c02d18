//! Reel slots. Each row is a payline carrying an equal share of the stake and
//! wins when every reel shows the same symbol on that row.

use crate::config::SlotsConfig;
use crate::games::fair_rng::SeedContext;
use crate::games::types::{fair_multiplier, payout_for, GameData, GameType, SettledGame};

/// Equally likely symbol combinations along one line, per winning combination.
fn line_space(reels: usize, symbols: usize) -> u64 {
    (symbols as u64).pow(reels as u32 - 1)
}

/// Multiplier paid on a single line's share of the stake.
pub fn line_multiplier(rtp: f64, rules: &SlotsConfig) -> f64 {
    fair_multiplier(rtp, 1, line_space(rules.reels, rules.symbols.len()))
}

pub fn winning_rows(grid: &[Vec<usize>], rows: usize) -> Vec<usize> {
    (0..rows)
        .filter(|&row| {
            let first = grid[0][row];
            grid.iter().all(|reel| reel[row] == first)
        })
        .collect()
}

pub fn settle(stake: u64, rtp: f64, rules: &SlotsConfig, ctx: &SeedContext<'_>) -> SettledGame {
    let grid = ctx.slot_grid(rules.reels, rules.rows, rules.symbols.len());
    let winners = winning_rows(&grid, rules.rows);
    let multiplier = line_multiplier(rtp, rules) * winners.len() as f64 / rules.rows as f64;
    let payout = if winners.is_empty() { 0 } else { payout_for(stake, multiplier) };

    let named = grid
        .iter()
        .map(|reel| reel.iter().map(|&s| rules.symbols[s].clone()).collect())
        .collect();

    SettledGame::new(
        GameType::Slots,
        GameData::Slots {
            grid: named,
            winning_rows: winners,
        },
        stake,
        payout,
        multiplier,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_multiplier_gives_rtp() {
        let rules = SlotsConfig::default();
        let p_line = 1.0 / line_space(rules.reels, rules.symbols.len()) as f64;
        let ev = line_multiplier(0.96, &rules) * p_line;
        assert!((ev - 0.96).abs() < 1e-12);
    }

    #[test]
    fn test_winning_rows_detection() {
        let grid = vec![vec![0, 1, 2], vec![0, 3, 2], vec![0, 1, 2]];
        assert_eq!(winning_rows(&grid, 3), vec![0, 2]);
    }

    #[test]
    fn test_settle_grid_uses_symbol_names() {
        let rules = SlotsConfig::default();
        let ctx = SeedContext::new("server", "client", 11);
        let game = settle(300, 0.96, &rules, &ctx);
        match game.data {
            GameData::Slots { grid, winning_rows } => {
                assert_eq!(grid.len(), rules.reels);
                assert!(grid.iter().flatten().all(|s| rules.symbols.contains(s)));
                assert_eq!(game.payout == 0, winning_rows.is_empty());
            }
            _ => panic!("expected slots data"),
        }
    }
}
