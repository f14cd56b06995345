//! Vega Order Manager
//!
//! Sits between the decision engine and the broker, responsible for:
//! - **Submission**: translates `OrderIntent`s into broker requests
//! - **Retries**: exponential backoff on transient failures
//! - **Circuit breaker**: trips after consecutive failures, short-circuits
//!   all submissions while open, half-open probe after cool-down
//! - **Rate limiting**: minimum spacing between broker calls
//! - **Reconciliation**: polls order status to a terminal state, applies
//!   fills to the position ledger, emits journal records
//!
//! ```text
//! Engine ──OrderIntent──► ┌───────────────────────────────┐
//!                         │         Order Manager         │
//!                         │  breaker ─► rate limit ─►     │
//!                         │  submit ─► poll ─► reconcile  │
//!                         └──────┬─────────────┬──────────┘
//!                                │             │
//!                             Broker      Ledger + Journal
//! ```

pub mod breaker;
pub mod error;
pub mod manager;
pub mod rate_limit;

pub use breaker::{BreakerState, CircuitBreaker};
pub use error::{OrderError, Result};
pub use manager::{ExecutionReport, OrderManager};
pub use rate_limit::RateLimiter;
