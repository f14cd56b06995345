//! Tick message and the transport it arrives on

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FeedResult;
use vega_core::{Price, Symbol, Timestamp};

/// One last-traded-price update for an instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: Symbol,
    pub price: Price,
    pub timestamp: Timestamp,
}

/// Transport delivering ticks from the outside world
///
/// Implementations: the scripted transport in tests, and a websocket
/// adapter outside this workspace. `next_tick` is ordered per instrument
/// but carries no cross-instrument ordering guarantee.
#[async_trait]
pub trait TickTransport: Send {
    /// Establish (or re-establish) the connection
    async fn connect(&mut self) -> FeedResult<()>;

    /// Subscribe to the given instrument set, replacing any previous set
    async fn subscribe(&mut self, symbols: &[Symbol]) -> FeedResult<()>;

    /// Wait for the next tick
    async fn next_tick(&mut self) -> FeedResult<Tick>;
}
