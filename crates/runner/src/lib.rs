//! Vega Runner - Decision Loop Orchestrator
//!
//! Wires the market data feed, the strategy engine, the risk monitor,
//! and the order manager into one serialized decision loop. Cycles
//! never overlap: each tick of the loop evaluates, screens, and
//! dispatches to completion before the next begins.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────┐
//!   │ MarketDataFeed  │──── ticks ───▶ QuoteCache
//!   └───────┬─────────┘
//!           │ health (watch)
//!           ▼
//!   ┌─────────────────────────────────────────────┐
//!   │               TradingRunner                 │
//!   │                                             │
//!   │   every evaluate_interval_ms:               │
//!   │     RiskMonitor::check ── ForceLiquidate ─┐ │
//!   │           │ Ok                            │ │
//!   │           ▼                               │ │
//!   │     StrategyEngine::evaluate              │ │
//!   │           │ intents                       │ │
//!   │           ▼                               │ │
//!   │     RiskMonitor::screen (vetoes)          │ │
//!   │           │                               │ │
//!   │           ▼                               ▼ │
//!   │     OrderManager::execute ◀───────────────┘ │
//!   └───────────┬─────────────────────────────────┘
//!               │ fills, snapshots
//!               ▼
//!         ┌───────────┐
//!         │ Journal   │
//!         └───────────┘
//! ```

pub mod journal;
pub mod runner;
pub mod session;

pub use journal::{JsonlJournal, LogJournal};
pub use runner::TradingRunner;
pub use session::StaticSessionProvider;
