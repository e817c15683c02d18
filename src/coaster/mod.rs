//! Continuous leveraged price game
//!
//! One seeded price series per UTC day, ticked on a fixed interval. Users open
//! a single leveraged up/down position against it and either cash out or get
//! liquidated when the price crosses their bust level.

pub mod engine;
pub mod position;
pub mod price;

pub use engine::{CashoutResult, CoasterCore, CoasterEngine, CoasterEvent, CoasterHandle, CoasterStatus, PlaceBetRequest};
pub use position::{Direction, Position, PositionStatus};
pub use price::{replay_prices, round_id_for, PriceWalk, WalkParams};
