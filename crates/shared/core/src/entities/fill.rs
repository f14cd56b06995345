//! Fills - broker confirmations that update the ledger

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::values::{Price, Quantity, Symbol, Timestamp};

/// Buy or sell at the broker level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionSide {
    Buy,
    Sell,
}

impl TransactionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

/// A fill reported by the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Broker-assigned order id
    pub order_id: String,
    /// Correlation id of the intent that produced the order
    pub correlation_id: Uuid,
    pub symbol: Symbol,
    pub side: TransactionSide,
    pub quantity: Quantity,
    /// Average fill premium
    pub premium: Price,
    pub timestamp: Timestamp,
}
