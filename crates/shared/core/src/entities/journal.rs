//! Journal records handed to the reporting collaborator
//!
//! One `JournalRecord` per fill, one `PortfolioSnapshot` per reporting
//! interval. Both are plain serializable values; the sink that persists
//! them lives outside this system's core.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::values::{Price, Quantity, Symbol, Timestamp};

/// Trade-journal entry for a single fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalRecord {
    pub timestamp: Timestamp,
    pub order_id: String,
    pub correlation_id: Uuid,
    pub symbol: Symbol,
    pub side: String,
    pub quantity: Quantity,
    pub premium: Price,
    pub status: String,
    /// Spot price at the time of the fill, when a quote was available
    pub spot: Option<Price>,
}

/// Periodic portfolio state written on a fixed interval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: Timestamp,
    pub active_legs: usize,
    pub pending_orders: usize,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    /// Net premium collected per unit, the point at which the book breaks even
    pub breakeven_estimate: Option<Price>,
    /// Margin used over capital allocated
    pub exposure_ratio: Decimal,
}
