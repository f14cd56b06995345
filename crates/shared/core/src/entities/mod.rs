//! Trading entities: legs, order intents, fills, journal records

mod fill;
mod intent;
mod journal;
mod leg;

pub use fill::{Fill, TransactionSide};
pub use intent::{CloseReason, IntentKind, OrderIntent};
pub use journal::{JournalRecord, PortfolioSnapshot};
pub use leg::{Leg, LegId, LegSide, LegStatus};
