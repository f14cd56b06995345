//! Session acquisition port
//!
//! Authentication itself happens outside this system; the runner asks a
//! `SessionProvider` for a valid handle at bootstrap and whenever the
//! broker reports an auth failure.

use async_trait::async_trait;

use crate::broker::BrokerResult;
use vega_core::Timestamp;

/// An authenticated broker session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: String,
    pub established_at: Timestamp,
}

/// Port supplying authenticated sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Acquire a valid session, refreshing credentials if needed
    async fn acquire(&self) -> BrokerResult<SessionHandle>;
}
