//! Coaster engine
//!
//! [`CoasterCore`] owns the price walk and every open position; it is only
//! ever driven from one task. [`CoasterEngine::spawn`] wraps it in an actor
//! that interleaves ticks with commands from [`CoasterHandle`]s, so a bust
//! check and a cashout on the same position can never race.

use crate::{
    coaster::{
        position::{Direction, Position},
        price::{round_id_for, PriceWalk, WalkParams},
    },
    config::CoasterConfig,
    errors::{CoasterError, ValidationError, WagerError, WagerResult},
    fairness::SeedReveal,
    ledger::{CurrencyMode, Ledger},
    store::{PositionRepository, SeedRevealRepository},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub direction: Direction,
    pub wager: u64,
    pub leverage: f64,
    #[serde(default)]
    pub currency_mode: CurrencyMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashoutResult {
    pub position: Position,
    pub payout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoasterStatus {
    pub price: f64,
    pub tick_index: u64,
    pub round_id: String,
    pub server_seed_hash: String,
    pub enabled: bool,
    pub open_positions: usize,
}

/// Engine notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CoasterEvent {
    #[serde(rename = "round_started")]
    RoundStarted {
        round_id: String,
        server_seed_hash: String,
        previous: Option<SeedReveal>,
    },

    #[serde(rename = "tick")]
    Tick {
        round_id: String,
        tick_index: u64,
        price: f64,
    },

    #[serde(rename = "position_opened")]
    PositionOpened { position: Position },

    #[serde(rename = "position_busted")]
    PositionBusted { position: Position },

    #[serde(rename = "position_cashed_out")]
    PositionCashedOut { position: Position, payout: u64 },
}

/// Price state plus open positions, keyed by user.
pub struct CoasterCore {
    config: CoasterConfig,
    walk: PriceWalk,
    open: HashMap<String, Position>,
    history: VecDeque<Position>,
    ledger: Arc<Ledger>,
    positions: Arc<dyn PositionRepository>,
    reveals: Arc<dyn SeedRevealRepository>,
    events: broadcast::Sender<CoasterEvent>,
}

impl CoasterCore {
    pub fn new(
        config: CoasterConfig,
        ledger: Arc<Ledger>,
        positions: Arc<dyn PositionRepository>,
        reveals: Arc<dyn SeedRevealRepository>,
        now: DateTime<Utc>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let walk = PriceWalk::start(round_id_for(now), WalkParams::from(&config));
        info!(round_id = %walk.round_id, server_seed_hash = %walk.server_seed_hash, "Coaster round started");
        Self {
            config,
            walk,
            open: HashMap::new(),
            history: VecDeque::new(),
            ledger,
            positions,
            reveals,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoasterEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CoasterEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn status(&self) -> CoasterStatus {
        CoasterStatus {
            price: self.walk.price,
            tick_index: self.walk.tick_index,
            round_id: self.walk.round_id.clone(),
            server_seed_hash: self.walk.server_seed_hash.clone(),
            enabled: self.config.enabled,
            open_positions: self.open.len(),
        }
    }

    pub fn position(&self, user_id: &str) -> Option<Position> {
        self.open.get(user_id).cloned()
    }

    /// Most recent terminal positions, newest first.
    pub fn history(&self, limit: usize) -> Vec<Position> {
        self.history.iter().take(limit).cloned().collect()
    }

    fn validate(&self, request: &PlaceBetRequest) -> Result<(), WagerError> {
        if !self.config.enabled {
            return Err(CoasterError::Disabled.into());
        }
        if request.wager < self.config.min_wager || request.wager > self.config.max_wager {
            return Err(ValidationError::StakeOutOfRange {
                stake: request.wager,
                min: self.config.min_wager,
                max: self.config.max_wager,
            }
            .into());
        }
        let leverage = request.leverage;
        if !leverage.is_finite() || leverage < self.config.min_leverage || leverage > self.config.max_leverage {
            return Err(ValidationError::invalid(
                "leverage",
                format!("must be between {} and {}", self.config.min_leverage, self.config.max_leverage),
            )
            .into());
        }
        Ok(())
    }

    /// Open a position at the current price. The wager is debited and the
    /// position persisted in one ledger transaction. The engine task never
    /// waits on a user's balance: a held lock surfaces as `Contention`.
    pub fn place_bet(&mut self, user_id: &str, request: PlaceBetRequest) -> WagerResult<Position> {
        self.validate(&request)?;
        if self.open.contains_key(user_id) {
            return Err(CoasterError::DuplicatePosition(user_id.to_string()).into());
        }

        let position = Position::open(
            user_id,
            &self.walk.round_id,
            request.direction,
            request.wager,
            request.leverage,
            self.walk.price,
            request.currency_mode,
        );
        self.ledger.try_transact(user_id, |balance| -> WagerResult<()> {
            balance.debit(position.wager, position.currency_mode)?;
            self.positions.save_position(&position)?;
            Ok(())
        })?;

        info!(
            user_id,
            position_id = %position.id,
            direction = ?position.direction,
            wager = position.wager,
            leverage = position.leverage,
            entry_price = position.entry_price,
            bust_price = position.bust_price,
            "Coaster position opened"
        );
        self.open.insert(user_id.to_string(), position.clone());
        self.emit(CoasterEvent::PositionOpened {
            position: position.clone(),
        });
        Ok(position)
    }

    pub fn cashout(&mut self, user_id: &str) -> WagerResult<CashoutResult> {
        let position = self
            .open
            .get(user_id)
            .cloned()
            .ok_or_else(|| CoasterError::NoOpenPosition(user_id.to_string()))?;
        let result = self.settle_cashout(&position)?;
        self.open.remove(user_id);
        Ok(result)
    }

    fn settle_cashout(&mut self, position: &Position) -> WagerResult<CashoutResult> {
        let closed = position.cashed_out(self.walk.price, self.config.edge);
        let payout = closed.payout;
        self.ledger.try_transact(&position.user_id, |balance| -> WagerResult<()> {
            if payout > 0 {
                balance.credit_winnings(payout, closed.currency_mode)?;
            }
            self.positions.save_position(&closed)?;
            Ok(())
        })?;

        info!(
            user_id = %closed.user_id,
            position_id = %closed.id,
            exit_price = self.walk.price,
            payout,
            pnl = closed.pnl,
            "Coaster position cashed out"
        );
        self.push_history(closed.clone());
        self.emit(CoasterEvent::PositionCashedOut {
            position: closed.clone(),
            payout,
        });
        Ok(CashoutResult {
            position: closed,
            payout,
        })
    }

    fn push_history(&mut self, position: Position) {
        self.history.push_front(position);
        self.history.truncate(self.config.history_capacity);
    }

    /// One scheduler step: roll the round if the date changed, advance the
    /// price, then liquidate every position the new price busts.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<Position> {
        if !self.config.enabled {
            return Vec::new();
        }
        let round_id = round_id_for(now);
        if round_id != self.walk.round_id {
            self.start_round(round_id);
        }

        let price = self.walk.step();
        self.emit(CoasterEvent::Tick {
            round_id: self.walk.round_id.clone(),
            tick_index: self.walk.tick_index,
            price,
        });
        self.settle_busts()
    }

    fn settle_busts(&mut self) -> Vec<Position> {
        let price = self.walk.price;
        let busted_users: Vec<String> = self
            .open
            .values()
            .filter(|p| p.is_busted_at(price))
            .map(|p| p.user_id.clone())
            .collect();

        let mut busted = Vec::with_capacity(busted_users.len());
        for user_id in busted_users {
            let Some(position) = self.open.remove(&user_id) else {
                continue;
            };
            let closed = position.busted(price);
            if let Err(e) = self.positions.save_position(&closed) {
                error!(position_id = %closed.id, error = %e, "Failed to persist busted position");
            }
            info!(
                user_id = %closed.user_id,
                position_id = %closed.id,
                bust_price = closed.bust_price,
                price,
                "Coaster position busted"
            );
            self.push_history(closed.clone());
            self.emit(CoasterEvent::PositionBusted {
                position: closed.clone(),
            });
            busted.push(closed);
        }
        busted
    }

    /// Close out the old round at its last price, reveal its seed, and reseed.
    fn start_round(&mut self, round_id: String) {
        let carried: Vec<Position> = self.open.drain().map(|(_, p)| p).collect();
        for position in carried {
            if let Err(e) = self.settle_cashout(&position) {
                // Leave it open in the next round rather than lose the wager.
                warn!(position_id = %position.id, error = %e, "Round-end cashout failed");
                self.open.insert(position.user_id.clone(), position);
            }
        }

        let previous = SeedReveal {
            server_seed: self.walk.server_seed().to_string(),
            server_seed_hash: self.walk.server_seed_hash.clone(),
            client_seed: self.walk.round_id.clone(),
            final_nonce: self.walk.tick_index,
            revealed_at: Utc::now(),
        };
        if let Err(e) = self.reveals.archive_reveal(&previous) {
            error!(round_id = %previous.client_seed, error = %e, "Failed to archive round seed");
        }

        self.walk = PriceWalk::start(round_id, WalkParams::from(&self.config));
        info!(round_id = %self.walk.round_id, server_seed_hash = %self.walk.server_seed_hash, "Coaster round started");
        self.emit(CoasterEvent::RoundStarted {
            round_id: self.walk.round_id.clone(),
            server_seed_hash: self.walk.server_seed_hash.clone(),
            previous: Some(previous),
        });
    }

    #[cfg(test)]
    pub(crate) fn set_price(&mut self, price: f64) {
        self.walk.set_price(price);
    }
}

enum Command {
    PlaceBet {
        user_id: String,
        request: PlaceBetRequest,
        reply: oneshot::Sender<WagerResult<Position>>,
    },
    Cashout {
        user_id: String,
        reply: oneshot::Sender<WagerResult<CashoutResult>>,
    },
    Status {
        reply: oneshot::Sender<CoasterStatus>,
    },
    Position {
        user_id: String,
        reply: oneshot::Sender<Option<Position>>,
    },
    History {
        limit: usize,
        reply: oneshot::Sender<Vec<Position>>,
    },
    Shutdown,
}

/// Cloneable command interface to a running engine.
#[derive(Clone)]
pub struct CoasterHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<CoasterEvent>,
}

impl CoasterHandle {
    fn send(&self, command: Command) -> Result<(), CoasterError> {
        self.commands.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CoasterError::Busy,
            mpsc::error::TrySendError::Closed(_) => CoasterError::EngineStopped,
        })
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, CoasterError> {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply))?;
        rx.await.map_err(|_| CoasterError::EngineStopped)
    }

    pub async fn place_bet(&self, user_id: &str, request: PlaceBetRequest) -> WagerResult<Position> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::PlaceBet {
            user_id,
            request,
            reply,
        })
        .await?
    }

    pub async fn cashout(&self, user_id: &str) -> WagerResult<CashoutResult> {
        let user_id = user_id.to_string();
        self.request(|reply| Command::Cashout { user_id, reply }).await?
    }

    pub async fn status(&self) -> WagerResult<CoasterStatus> {
        Ok(self.request(|reply| Command::Status { reply }).await?)
    }

    pub async fn position(&self, user_id: &str) -> WagerResult<Option<Position>> {
        let user_id = user_id.to_string();
        Ok(self.request(|reply| Command::Position { user_id, reply }).await?)
    }

    pub async fn history(&self, limit: usize) -> WagerResult<Vec<Position>> {
        Ok(self.request(|reply| Command::History { limit, reply }).await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoasterEvent> {
        self.events.subscribe()
    }

    pub fn shutdown(&self) {
        if self.commands.try_send(Command::Shutdown).is_err() {
            debug!("Coaster engine already stopped or saturated");
        }
    }
}

pub struct CoasterEngine;

impl CoasterEngine {
    /// Run `core` on its own task. Ticks never overlap: a slow tick delays the
    /// next one instead of bursting to catch up.
    pub fn spawn(core: CoasterCore) -> (CoasterHandle, JoinHandle<()>) {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = CoasterHandle {
            commands,
            events: core.events.clone(),
        };
        let task = tokio::spawn(Self::run(core, rx));
        (handle, task)
    }

    async fn run(mut core: CoasterCore, mut commands: mpsc::Receiver<Command>) {
        let mut ticker = tokio::time::interval(core.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    core.tick_at(Utc::now());
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        Command::PlaceBet { user_id, request, reply } => {
                            let _ = reply.send(core.place_bet(&user_id, request));
                        }
                        Command::Cashout { user_id, reply } => {
                            let _ = reply.send(core.cashout(&user_id));
                        }
                        Command::Status { reply } => {
                            let _ = reply.send(core.status());
                        }
                        Command::Position { user_id, reply } => {
                            let _ = reply.send(core.position(&user_id));
                        }
                        Command::History { limit, reply } => {
                            let _ = reply.send(core.history(limit));
                        }
                        Command::Shutdown => break,
                    }
                }
            }
        }
        info!(open_positions = core.open.len(), "Coaster engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coaster::position::PositionStatus;
    use crate::errors::LedgerError;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn core_with(config: CoasterConfig) -> (CoasterCore, Arc<Ledger>, Arc<MemoryStore>) {
        let ledger = Arc::new(Ledger::new());
        let store = Arc::new(MemoryStore::new());
        let core = CoasterCore::new(config, ledger.clone(), store.clone(), store.clone(), now());
        (core, ledger, store)
    }

    fn flat_core() -> (CoasterCore, Arc<Ledger>, Arc<MemoryStore>) {
        let config = CoasterConfig {
            volatility: 0.0,
            ..CoasterConfig::default()
        };
        core_with(config)
    }

    fn bet(direction: Direction, wager: u64, leverage: f64) -> PlaceBetRequest {
        PlaceBetRequest {
            direction,
            wager,
            leverage,
            currency_mode: CurrencyMode::PlayCredits,
        }
    }

    #[test]
    fn test_place_bet_debits_wager() {
        let (mut core, ledger, store) = flat_core();
        ledger.credit("alice", 100, CurrencyMode::PlayCredits).unwrap();

        let position = core.place_bet("alice", bet(Direction::Up, 40, 5.0)).unwrap();
        assert_eq!(position.entry_price, 1000.0);
        assert_eq!(ledger.balance("alice").play.available, 60);
        assert_eq!(store.get_position(&position.id).unwrap().status, PositionStatus::Open);
        assert_eq!(core.status().open_positions, 1);
    }

    #[test]
    fn test_held_balance_fails_fast_instead_of_stalling() {
        let (mut core, ledger, _) = flat_core();
        ledger.credit("alice", 100, CurrencyMode::PlayCredits).unwrap();

        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let holder = {
            let ledger = ledger.clone();
            std::thread::spawn(move || {
                ledger
                    .transact("alice", |_| {
                        held_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        Ok::<_, LedgerError>(())
                    })
                    .unwrap();
            })
        };
        held_rx.recv().unwrap();

        let started = std::time::Instant::now();
        let err = core.place_bet("alice", bet(Direction::Up, 40, 5.0)).unwrap_err();
        assert!(started.elapsed() < std::time::Duration::from_millis(100));
        assert!(matches!(err, WagerError::Ledger(LedgerError::Contention(_))));
        assert!(err.is_retryable());
        assert!(core.position("alice").is_none());

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        core.place_bet("alice", bet(Direction::Up, 40, 5.0)).unwrap();
        assert_eq!(ledger.balance("alice").play.available, 60);
    }

    #[test]
    fn test_cash_cashout_is_withdrawable() {
        let (mut core, ledger, _) = flat_core();
        ledger.transact("nora", |b| b.credit_redeemable(100)).unwrap();
        core.place_bet(
            "nora",
            PlaceBetRequest {
                direction: Direction::Up,
                wager: 100,
                leverage: 2.0,
                currency_mode: CurrencyMode::RedeemableCash,
            },
        )
        .unwrap();

        let result = core.cashout("nora").unwrap();
        let balance = ledger.balance("nora");
        assert_eq!(balance.cash.available, result.payout);
        assert_eq!(balance.cash_redeemable, result.payout);
    }

    #[test]
    fn test_one_open_position_per_user() {
        let (mut core, ledger, _) = flat_core();
        ledger.credit("alice", 100, CurrencyMode::PlayCredits).unwrap();
        core.place_bet("alice", bet(Direction::Up, 10, 2.0)).unwrap();

        let err = core.place_bet("alice", bet(Direction::Down, 10, 2.0)).unwrap_err();
        assert!(matches!(err, WagerError::Coaster(CoasterError::DuplicatePosition(_))));
        assert_eq!(ledger.balance("alice").play.available, 90);
    }

    #[test]
    fn test_insufficient_funds_leaves_no_position() {
        let (mut core, _, store) = flat_core();
        let err = core.place_bet("bob", bet(Direction::Up, 10, 2.0)).unwrap_err();
        assert!(matches!(err, WagerError::Ledger(LedgerError::InsufficientFunds { .. })));
        assert!(core.position("bob").is_none());
        assert!(store.positions_for_round("2026-10-16").is_empty());
    }

    #[test]
    fn test_wager_and_leverage_bounds() {
        let (mut core, ledger, _) = flat_core();
        ledger.credit("carol", 10_000, CurrencyMode::PlayCredits).unwrap();
        assert!(matches!(
            core.place_bet("carol", bet(Direction::Up, 0, 2.0)),
            Err(WagerError::Validation(_))
        ));
        assert!(matches!(
            core.place_bet("carol", bet(Direction::Up, 10, 0.5)),
            Err(WagerError::Validation(_))
        ));
        assert!(matches!(
            core.place_bet("carol", bet(Direction::Up, 10, f64::NAN)),
            Err(WagerError::Validation(_))
        ));
        assert_eq!(ledger.balance("carol").play.available, 10_000);
    }

    #[test]
    fn test_flat_cashout_refunds_wager() {
        let (mut core, ledger, _) = flat_core();
        ledger.credit("dave", 100, CurrencyMode::PlayCredits).unwrap();
        core.place_bet("dave", bet(Direction::Up, 100, 20.0)).unwrap();

        let result = core.cashout("dave").unwrap();
        assert_eq!(result.payout, 100);
        assert_eq!(result.position.status, PositionStatus::Cashed);
        assert_eq!(ledger.balance("dave").play.available, 100);
        assert!(core.position("dave").is_none());
        assert_eq!(core.history(10).len(), 1);

        assert!(matches!(
            core.cashout("dave"),
            Err(WagerError::Coaster(CoasterError::NoOpenPosition(_)))
        ));
    }

    #[test]
    fn test_down_position_busts_without_touching_others() {
        let (mut core, ledger, store) = flat_core();
        ledger.credit("erin", 10, CurrencyMode::PlayCredits).unwrap();
        ledger.credit("frank", 10, CurrencyMode::PlayCredits).unwrap();

        let down = core.place_bet("erin", bet(Direction::Down, 10, 10.0)).unwrap();
        assert_eq!(down.bust_price, 1000.0 * (1.0 + 1.0 / 10.0));
        let up = core.place_bet("frank", bet(Direction::Up, 10, 10.0)).unwrap();

        core.set_price(down.bust_price);
        let busted = core.tick_at(now());

        assert_eq!(busted.len(), 1);
        assert_eq!(busted[0].id, down.id);
        assert_eq!(busted[0].pnl, -10);
        assert_eq!(busted[0].status, PositionStatus::Busted);
        assert_eq!(store.get_position(&down.id).unwrap().status, PositionStatus::Busted);
        assert_eq!(ledger.balance("erin").play.available, 0);

        let survivor = core.position("frank").unwrap();
        assert_eq!(survivor, up);
        assert_eq!(ledger.balance("frank").play.available, 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let config = CoasterConfig {
            volatility: 0.0,
            history_capacity: 2,
            ..CoasterConfig::default()
        };
        let (mut core, ledger, _) = core_with(config);
        ledger.credit("gina", 100, CurrencyMode::PlayCredits).unwrap();
        for _ in 0..3 {
            core.place_bet("gina", bet(Direction::Up, 10, 2.0)).unwrap();
            core.cashout("gina").unwrap();
        }
        assert_eq!(core.history(10).len(), 2);
    }

    #[test]
    fn test_round_rollover_reseeds_and_closes_positions() {
        let (mut core, ledger, store) = flat_core();
        let mut events = core.subscribe();
        ledger.credit("hank", 50, CurrencyMode::PlayCredits).unwrap();
        core.place_bet("hank", bet(Direction::Up, 50, 2.0)).unwrap();
        let old_hash = core.status().server_seed_hash;

        core.tick_at(now());
        core.tick_at(Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 1).unwrap());

        let status = core.status();
        assert_eq!(status.round_id, "2026-10-17");
        assert_eq!(status.tick_index, 1);
        assert_ne!(status.server_seed_hash, old_hash);
        assert!(core.position("hank").is_none());
        assert_eq!(ledger.balance("hank").play.available, 50);

        let reveal = store.reveal_by_hash(&old_hash).unwrap();
        assert_eq!(reveal.client_seed, "2026-10-16");
        assert_eq!(reveal.final_nonce, 1);

        let mut saw_round_start = false;
        while let Ok(event) = events.try_recv() {
            if let CoasterEvent::RoundStarted { round_id, .. } = event {
                saw_round_start = round_id == "2026-10-17";
            }
        }
        assert!(saw_round_start);
    }

    #[test]
    fn test_disabled_engine() {
        let config = CoasterConfig {
            enabled: false,
            ..CoasterConfig::default()
        };
        let (mut core, ledger, _) = core_with(config);
        ledger.credit("ivy", 100, CurrencyMode::PlayCredits).unwrap();
        assert!(matches!(
            core.place_bet("ivy", bet(Direction::Up, 10, 2.0)),
            Err(WagerError::Coaster(CoasterError::Disabled))
        ));
        assert!(core.tick_at(now()).is_empty());
        assert!(!core.status().enabled);
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let (core, ledger, _) = flat_core();
        ledger.credit("jack", 100, CurrencyMode::PlayCredits).unwrap();
        let (handle, task) = CoasterEngine::spawn(core);

        let position = handle.place_bet("jack", bet(Direction::Up, 25, 3.0)).await.unwrap();
        assert_eq!(handle.position("jack").await.unwrap(), Some(position));

        let result = handle.cashout("jack").await.unwrap();
        assert_eq!(result.payout, 25);
        assert_eq!(handle.history(5).await.unwrap().len(), 1);

        handle.shutdown();
        task.await.unwrap();
        assert!(matches!(
            handle.status().await,
            Err(WagerError::Coaster(CoasterError::EngineStopped))
        ));
    }
}
