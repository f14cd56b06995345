//! Session providers

use async_trait::async_trait;
use chrono::Utc;

use vega_ports::{BrokerResult, SessionHandle, SessionProvider};

/// Provider that hands out a fixed session, for paper runs
pub struct StaticSessionProvider {
    session_id: String,
}

impl StaticSessionProvider {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn acquire(&self) -> BrokerResult<SessionHandle> {
        Ok(SessionHandle {
            session_id: self.session_id.clone(),
            established_at: Utc::now(),
        })
    }
}
