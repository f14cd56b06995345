//! Vega Risk Manager
//!
//! Pre-dispatch risk checks, evaluated once per decision cycle before any
//! intent reaches the order manager:
//!
//! - **Kill switches** (highest priority): volatility index above the
//!   configured threshold, portfolio loss past `shutdown_loss`, daily loss
//!   past the daily limit — each forces liquidation of every open leg.
//! - **Pause**: a terminal feed outage suspends decisioning for the cycle
//!   without touching positions.
//! - **Per-intent vetoes**: projected margin utilization and single-strike
//!   concentration suppress the offending intents only; the rest proceed.
//!
//! The monitor is a pure function of ledger and market state; it performs
//! no I/O and emits no orders itself — forced liquidation is returned as a
//! synthetic intent set for the order manager to execute.

mod monitor;
mod verdict;

pub use monitor::RiskMonitor;
pub use verdict::{LiquidateReason, MarketState, RiskVerdict, Veto, VetoReason};
