//! Single-bet games
//!
//! Every module here is a pure function from `(stake, params, seed context)`
//! to a [`SettledGame`](types::SettledGame). No module touches balances.

pub mod coinflip;
pub mod crash;
pub mod dice;
pub mod fair_rng;
pub mod processor;
pub mod roulette;
pub mod slots;
pub mod types;

pub use fair_rng::SeedContext;
pub use processor::GameProcessor;
pub use types::*;
