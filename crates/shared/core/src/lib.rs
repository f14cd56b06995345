//! Vega Core Domain
//!
//! Pure domain types for the Vega options trading system.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod config;
pub mod entities;
pub mod instruments;
pub mod values;

// Re-export commonly used types at crate root
pub use config::{StrategyConfig, StrategyMode, TradingCalendar};
pub use entities::{
    CloseReason,
    Fill,
    IntentKind,
    // Journal types
    JournalRecord,
    // Core trading entities
    Leg,
    LegId,
    LegSide,
    LegStatus,
    OrderIntent,
    PortfolioSnapshot,
    TransactionSide,
};
pub use instruments::{OptionContract, OptionKind, nearest_strike};
pub use values::{Price, Quantity, Symbol, Timestamp};
