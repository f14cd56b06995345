//! Journal sink port

use async_trait::async_trait;

use vega_core::{JournalRecord, PortfolioSnapshot};

/// Port receiving trade-journal entries and periodic snapshots
///
/// Implementations must be non-blocking from the caller's point of view;
/// a slow sink must never stall the decision loop.
#[async_trait]
pub trait JournalSink: Send + Sync {
    /// Record a fill
    async fn record(&self, record: JournalRecord);

    /// Record a periodic portfolio snapshot
    async fn snapshot(&self, snapshot: PortfolioSnapshot);
}
