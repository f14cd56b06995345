//! Vega Strategy Decision Engine
//!
//! The tick-driven brain of the system. Each evaluation cycle it reads
//! the position ledger and quote cache and emits an ordered batch of
//! `OrderIntent`s:
//!
//! ```text
//!            ┌──────────────────────────────────────────┐
//! Quotes ──► │             StrategyEngine               │
//! Ledger ──► │  entry ─► rollover ─► profit/stop-loss   │ ──► intents
//!            │  ─► hedge rules ─► side-points exit      │
//!            └──────────────────────────────────────────┘
//! ```
//!
//! Triggers fire in a fixed order, so when several conditions hold in the
//! same cycle the emitted sequence is deterministic. Strike selection is
//! delegated to a `StrategyVariant` (straddle, strangle, iron fly);
//! trigger rules are shared engine code parameterized by config.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vega_strategy::{StrategyEngine, Straddle};
//!
//! let mut engine = StrategyEngine::new(config, Box::new(Straddle), expiry);
//! engine.on_connected();
//! let intents = engine.evaluate(&mut ledger, &quotes, now);
//! ```

mod engine;
mod iron_fly;
mod state;
mod straddle;
mod strangle;
mod variant;

pub use engine::StrategyEngine;
pub use iron_fly::IronFly;
pub use state::EngineState;
pub use straddle::Straddle;
pub use strangle::Strangle;
pub use variant::{StrategyVariant, variant_for};
