use crate::ledger::CurrencyMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported per-bet game families
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Dice,
    CoinFlip,
    Slots,
    Roulette,
    Crash,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Dice => write!(f, "dice"),
            GameType::CoinFlip => write!(f, "coinflip"),
            GameType::Slots => write!(f, "slots"),
            GameType::Roulette => write!(f, "roulette"),
            GameType::Crash => write!(f, "crash"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DicePair {
    pub a: u8,
    pub b: u8,
}

impl DicePair {
    pub fn sum(&self) -> u8 {
        self.a + self.b
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiceDirection {
    Under,
    Over,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouletteColor {
    Red,
    Black,
    Green,
}

/// Roulette wagers. Dozens and columns are numbered 1..=3.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RouletteBet {
    Straight(u8),
    Red,
    Black,
    Odd,
    Even,
    Low,
    High,
    Dozen(u8),
    Column(u8),
}

/// Per-game request parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameParams {
    Dice { target: u8, direction: DiceDirection },
    CoinFlip { choice: CoinSide },
    Slots,
    Roulette { bet: RouletteBet },
    Crash { target_multiplier: f64 },
}

impl GameParams {
    pub fn game_type(&self) -> GameType {
        match self {
            GameParams::Dice { .. } => GameType::Dice,
            GameParams::CoinFlip { .. } => GameType::CoinFlip,
            GameParams::Slots => GameType::Slots,
            GameParams::Roulette { .. } => GameType::Roulette,
            GameParams::Crash { .. } => GameType::Crash,
        }
    }
}

/// Game-specific outcome fields (discriminated union)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum GameData {
    Dice { pair: DicePair, sum: u8 },
    CoinFlip { side: CoinSide },
    Slots { grid: Vec<Vec<String>>, winning_rows: Vec<usize> },
    Roulette { pocket: u8, color: RouletteColor },
    Crash { crash_point: f64 },
}

/// Result of running one settlement module. No money has moved yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettledGame {
    pub game_type: GameType,
    pub data: GameData,
    pub outcome: GameOutcome,
    pub multiplier: f64,
    pub stake: u64,
    pub payout: u64,
    pub profit: i64,
}

impl SettledGame {
    pub fn new(game_type: GameType, data: GameData, stake: u64, payout: u64, multiplier: f64) -> Self {
        let outcome = if payout > 0 {
            GameOutcome::Win
        } else {
            GameOutcome::Loss
        };
        Self {
            game_type,
            data,
            outcome,
            multiplier,
            stake,
            payout,
            profit: payout as i64 - stake as i64,
        }
    }
}

/// Client bet request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetRequest {
    pub stake: u64,
    pub params: GameParams,
    pub client_seed: String,
    pub nonce: u64,
    pub currency_mode: CurrencyMode,
}

/// Bet response with the material needed to verify it later
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetResponse {
    pub bet_id: String,
    pub result: SettledGame,
    pub payout: u64,
    pub profit: i64,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
    pub next_server_seed_hash: String,
    pub next_nonce: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_server_seed: Option<String>,
}

/// Fair multiplier for `winning` outcomes out of `total` equally likely ones.
pub fn fair_multiplier(rtp: f64, winning: u64, total: u64) -> f64 {
    rtp * total as f64 / winning as f64
}

/// Payout rounded down to whole minor units.
pub fn payout_for(stake: u64, multiplier: f64) -> u64 {
    (stake as f64 * multiplier).floor() as u64
}
