//! Vega Position Ledger
//!
//! Single source of truth for open and closed legs:
//! - applies fills (idempotently, keyed by correlation id)
//! - maintains the hedge linkage invariant: a HEDGE_BUY leg never
//!   outlives its referencing SELL leg unnoticed — orphans are queryable
//! - marks premiums from ticks and aggregates realized/unrealized PnL
//! - serializes to JSON and reloads with identical aggregate state
//!
//! The ledger is a pure in-memory structure with no I/O; callers wrap it
//! in a lock and persist snapshots through the journal sink.

mod error;
mod ledger;

pub use error::{LedgerError, Result};
pub use ledger::PositionLedger;
