//! Vega Market Data Feed
//!
//! Turns an external tick transport into:
//! - a broadcast stream of `Tick`s for the decision engine
//! - a concurrent `QuoteCache` holding the last tick per instrument
//! - a `watch`-published `FeedHealth` signal
//!
//! ```text
//! TickTransport ──> MarketDataFeed ──broadcast──> engine / risk
//!                        │
//!                        ├──> QuoteCache (last tick per symbol)
//!                        └──> watch<FeedHealth>
//! ```
//!
//! On connection loss the feed reconnects with bounded exponential
//! backoff and re-subscribes to the same instrument set. Ticks missed
//! during an outage are simply absent; consumers must timestamp-check
//! cached quotes. After the configured number of consecutive reconnect
//! failures the feed publishes `Unavailable` and stops.

mod cache;
mod error;
mod feed;
mod tick;

pub use cache::QuoteCache;
pub use error::{FeedError, FeedResult};
pub use feed::{FeedHealth, MarketDataFeed};
pub use tick::{Tick, TickTransport};
