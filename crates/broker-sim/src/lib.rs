//! Vega Paper Broker
//!
//! An in-memory `BrokerClient` for integration tests and dry runs.
//! Orders fill immediately at the scripted premium for their symbol
//! (falling back to a default), positions net up per symbol, and
//! failure behavior is scriptable:
//! - `fail_next(n)`: the next n placements return a transient error
//! - `reject_market(true)`: market orders are rejected, limit orders
//!   fill — exercises the market-to-limit fallback path
//!
//! Thread-safe throughout; clones share state.

mod broker;

pub use broker::PaperBroker;
