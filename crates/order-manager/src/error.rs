//! Order Manager errors

use thiserror::Error;
use vega_ledger::LedgerError;
use vega_ports::BrokerError;

#[derive(Error, Debug)]
pub enum OrderError {
    /// Breaker is open; the broker was never contacted
    #[error("Circuit breaker open, submission short-circuited")]
    CircuitOpen,

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: BrokerError },

    #[error("Order {order_id} did not reach a terminal state in time")]
    ReconcileTimeout { order_id: String },

    #[error("Order {order_id} rejected by broker: {reason}")]
    Rejected { order_id: String, reason: String },

    #[error("No fresh quote for {0}")]
    StaleQuote(String),

    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, OrderError>;
