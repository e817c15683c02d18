//! Wagerhouse - settlement core for a provably fair wagering platform
//!
//! Turns commit-reveal seed pairs into game outcomes, settles them against a
//! dual-currency ledger, runs the Coaster leveraged price game and applies
//! payment processor notifications idempotently.

pub mod coaster;
pub mod config;
pub mod errors;
pub mod factory;
pub mod fairness;
pub mod games;
pub mod hooks;
pub mod ledger;
pub mod orchestrator;
pub mod store;
pub mod verify;

pub use config::{ConfigLoader, WagerConfig};
pub use errors::{WagerError, WagerResult};
pub use factory::{Platform, PlatformFactory};
pub use fairness::{Commitment, FairnessManager, SeedPair, SeedReveal};
pub use ledger::{Balance, CurrencyMode, Ledger};
pub use orchestrator::Orchestrator;
pub use store::{BetRecord, MemoryStore};
