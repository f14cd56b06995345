//! Ledger errors

use thiserror::Error;
use uuid::Uuid;
use vega_core::LegId;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unknown leg: {0}")]
    UnknownLeg(LegId),

    #[error("Leg {0} is not active")]
    LegNotActive(LegId),

    #[error("Covered sell leg {0} is not active")]
    CoveredSellNotActive(LegId),

    #[error("Fill for correlation id {0} already applied")]
    DuplicateFill(Uuid),

    #[error("Snapshot serialization failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
