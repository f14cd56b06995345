//! Broker port: order placement, quotes, positions, margin
//!
//! The order manager is the only component that talks to this port for
//! order actions; the feed uses it for quotes during reconnect gaps.
//! Error variants carry the retry policy: only `Transient` and `Timeout`
//! are retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use vega_core::{Price, Quantity, Symbol, Timestamp, TransactionSide};

/// Errors surfaced by broker interactions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Network or broker-side hiccup, safe to retry with backoff
    #[error("Transient broker error: {0}")]
    Transient(String),

    /// Broker-side validation failure, never retried
    #[error("Order rejected: {0}")]
    Rejected(String),

    /// Session invalid or expired, halts the cycle
    #[error("Authentication failure: {0}")]
    Auth(String),

    /// No terminal order state within the submit deadline
    #[error("Broker call timed out")]
    Timeout,

    /// Circuit breaker is open, submission short-circuited locally
    #[error("Circuit breaker open, submission refused")]
    CircuitOpen,
}

impl BrokerError {
    /// True if a retry with backoff is appropriate
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout)
    }
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// What the order manager sends to the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client-side tag carried through to fills
    pub correlation_id: Uuid,
    pub symbol: Symbol,
    pub side: TransactionSide,
    pub quantity: Quantity,
    /// None places a market order
    pub limit_price: Option<Price>,
    /// Stop-loss trigger, for SL order types
    pub trigger_price: Option<Price>,
}

/// Broker-side lifecycle state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Pending,
    Open,
    Filled,
    Rejected,
    Cancelled,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Rejected | Self::Cancelled)
    }
}

/// Broker's view of a submitted order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerOrder {
    pub order_id: String,
    pub correlation_id: Uuid,
    pub symbol: Symbol,
    pub side: TransactionSide,
    pub state: OrderState,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    /// Average fill premium over all partial fills
    pub average_premium: Option<Price>,
    pub updated_at: Timestamp,
}

/// Broker's view of a net position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub symbol: Symbol,
    /// Signed: negative for net short
    pub quantity: Quantity,
    pub average_premium: Price,
}

/// Last traded price for an instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub last_price: Price,
    pub timestamp: Timestamp,
}

/// Port to the brokerage
///
/// Implementations: the paper broker used in tests, and a live adapter
/// outside this workspace.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Submit an order; returns the broker-assigned order id
    async fn place_order(&self, request: &OrderRequest) -> BrokerResult<String>;

    /// Modify price/trigger on an open order
    async fn modify_order(
        &self,
        order_id: &str,
        limit_price: Option<Price>,
        trigger_price: Option<Price>,
    ) -> BrokerResult<()>;

    /// Cancel an open order
    async fn cancel_order(&self, order_id: &str) -> BrokerResult<()>;

    /// Current broker-side state of an order
    async fn order_status(&self, order_id: &str) -> BrokerResult<BrokerOrder>;

    /// All net positions for the session
    async fn positions(&self) -> BrokerResult<Vec<BrokerPosition>>;

    /// Last traded price for a single instrument
    async fn quote(&self, symbol: &str) -> BrokerResult<Quote>;

    /// Margin currently available for new exposure
    async fn margin_available(&self) -> BrokerResult<Price>;
}
