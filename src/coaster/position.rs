//! Leveraged positions and their settlement math

use crate::ledger::CurrencyMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Cashed,
    Busted,
}

/// Price at which the leveraged value of a position reaches zero.
pub fn bust_price(entry_price: f64, leverage: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Up => entry_price * (1.0 - 1.0 / leverage),
        Direction::Down => entry_price * (1.0 + 1.0 / leverage),
    }
}

/// Leveraged return, positive when the price moved the chosen way.
pub fn signed_return(direction: Direction, entry_price: f64, current_price: f64, leverage: f64) -> f64 {
    direction.sign() * (current_price - entry_price) / entry_price * leverage
}

/// The house edge only applies to gains.
pub fn profit_factor(signed_return: f64, edge: f64) -> f64 {
    if signed_return > 0.0 {
        signed_return - edge * signed_return
    } else {
        signed_return
    }
}

pub fn cashout_payout(wager: u64, profit_factor: f64) -> u64 {
    (wager as f64 * (1.0 + profit_factor).max(0.0)).floor() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub id: String,
    pub user_id: String,
    pub round_id: String,
    pub direction: Direction,
    pub wager: u64,
    pub leverage: f64,
    pub entry_price: f64,
    pub bust_price: f64,
    pub status: PositionStatus,
    pub exit_price: Option<f64>,
    pub payout: u64,
    pub pnl: i64,
    pub roi: f64,
    pub currency_mode: CurrencyMode,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn open(
        user_id: &str,
        round_id: &str,
        direction: Direction,
        wager: u64,
        leverage: f64,
        entry_price: f64,
        currency_mode: CurrencyMode,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            round_id: round_id.to_string(),
            direction,
            wager,
            leverage,
            entry_price,
            bust_price: bust_price(entry_price, leverage, direction),
            status: PositionStatus::Open,
            exit_price: None,
            payout: 0,
            pnl: 0,
            roi: 0.0,
            currency_mode,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Price crossed the bust level against the position.
    pub fn is_busted_at(&self, price: f64) -> bool {
        match self.direction {
            Direction::Up => price <= self.bust_price,
            Direction::Down => price >= self.bust_price,
        }
    }

    pub fn payout_at(&self, price: f64, edge: f64) -> u64 {
        let ret = signed_return(self.direction, self.entry_price, price, self.leverage);
        cashout_payout(self.wager, profit_factor(ret, edge))
    }

    /// Closed copy with the outcome filled in.
    pub fn closed(&self, status: PositionStatus, exit_price: f64, payout: u64) -> Self {
        let pnl = payout as i64 - self.wager as i64;
        Self {
            status,
            exit_price: Some(exit_price),
            payout,
            pnl,
            roi: pnl as f64 / self.wager as f64,
            closed_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    pub fn cashed_out(&self, price: f64, edge: f64) -> Self {
        self.closed(PositionStatus::Cashed, price, self.payout_at(price, edge))
    }

    pub fn busted(&self, price: f64) -> Self {
        self.closed(PositionStatus::Busted, price, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(direction: Direction, wager: u64, leverage: f64) -> Position {
        Position::open("alice", "2026-10-16", direction, wager, leverage, 1000.0, CurrencyMode::PlayCredits)
    }

    #[test]
    fn test_bust_price_exact() {
        assert_eq!(position(Direction::Down, 10, 10.0).bust_price, 1000.0 * (1.0 + 1.0 / 10.0));
        assert_eq!(position(Direction::Up, 10, 10.0).bust_price, 1000.0 * (1.0 - 1.0 / 10.0));
        assert_eq!(position(Direction::Up, 10, 1.0).bust_price, 0.0);
    }

    #[test]
    fn test_bust_crossing_is_adverse_only() {
        let up = position(Direction::Up, 10, 10.0);
        assert!(!up.is_busted_at(1200.0));
        assert!(up.is_busted_at(up.bust_price));
        assert!(up.is_busted_at(800.0));

        let down = position(Direction::Down, 10, 10.0);
        assert!(!down.is_busted_at(900.0));
        assert!(down.is_busted_at(1100.5));
    }

    #[test]
    fn test_flat_cashout_returns_wager() {
        let pos = position(Direction::Up, 250, 50.0);
        assert_eq!(pos.payout_at(1000.0, 0.0), 250);
        assert_eq!(pos.payout_at(1000.0, 0.05), 250);
    }

    #[test]
    fn test_edge_applies_to_profit_only() {
        let pos = position(Direction::Up, 100, 10.0);
        // +1% move at 10x is +10%; the house keeps 5% of the gain.
        assert_eq!(pos.payout_at(1010.0, 0.05), 109);
        // -1% move at 10x is -10%, untouched by the edge.
        assert_eq!(pos.payout_at(990.0, 0.05), 90);
    }

    #[test]
    fn test_payout_never_negative() {
        let pos = position(Direction::Down, 100, 10.0);
        assert_eq!(pos.payout_at(1500.0, 0.0), 0);
    }

    #[test]
    fn test_closed_fields() {
        let pos = position(Direction::Down, 10, 10.0);
        let busted = pos.busted(1100.0);
        assert_eq!(busted.status, PositionStatus::Busted);
        assert_eq!(busted.pnl, -10);
        assert_eq!(busted.roi, -1.0);
        assert_eq!(busted.exit_price, Some(1100.0));
        assert!(busted.closed_at.is_some());
        assert_eq!(busted.id, pos.id);
    }
}
