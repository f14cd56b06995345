//! Feed driver: connection lifecycle, reconnection, fan-out

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{broadcast, watch};

use crate::cache::QuoteCache;
use crate::error::{FeedError, FeedResult};
use crate::tick::{Tick, TickTransport};
use vega_core::Symbol;

const TICK_CHANNEL_CAPACITY: usize = 1024;

/// Connection health, published on a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedHealth {
    /// Connected and delivering ticks
    Live,
    /// Connection lost, reconnect in progress
    Reconnecting { attempt: u32 },
    /// Reconnect attempts exhausted, feed stopped
    Unavailable,
}

/// Drives a `TickTransport`, fanning ticks out to subscribers and the
/// quote cache
pub struct MarketDataFeed {
    transport: Box<dyn TickTransport>,
    symbols: Vec<Symbol>,
    cache: QuoteCache,
    tick_tx: broadcast::Sender<Tick>,
    health_tx: watch::Sender<FeedHealth>,
    health_rx: watch::Receiver<FeedHealth>,
    max_reconnect_attempts: u32,
    backoff_base: Duration,
}

impl MarketDataFeed {
    pub fn new(
        transport: Box<dyn TickTransport>,
        symbols: Vec<Symbol>,
        max_reconnect_attempts: u32,
    ) -> Self {
        let (tick_tx, _) = broadcast::channel(TICK_CHANNEL_CAPACITY);
        let (health_tx, health_rx) = watch::channel(FeedHealth::Reconnecting { attempt: 0 });
        Self {
            transport,
            symbols,
            cache: QuoteCache::new(),
            tick_tx,
            health_tx,
            health_rx,
            max_reconnect_attempts,
            backoff_base: Duration::from_secs(1),
        }
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// New receiver for the tick stream
    pub fn subscribe_ticks(&self) -> broadcast::Receiver<Tick> {
        self.tick_tx.subscribe()
    }

    /// Watch handle over connection health
    pub fn health(&self) -> watch::Receiver<FeedHealth> {
        self.health_rx.clone()
    }

    /// Shared handle to the last-tick cache
    pub fn cache(&self) -> QuoteCache {
        self.cache.clone()
    }

    /// Run until shutdown, the stream ends, or the feed becomes
    /// unavailable
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> FeedResult<()> {
        self.reconnect().await?;
        let mut delivered_since_connect = false;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("[Feed] Shutdown requested");
                        return Ok(());
                    }
                }
                tick = self.transport.next_tick() => match tick {
                    Ok(tick) => {
                        debug!("[Feed] {} @ {}", tick.symbol, tick.price);
                        delivered_since_connect = true;
                        self.cache.update(tick.clone());
                        // No subscribers is fine; the cache still updates
                        let _ = self.tick_tx.send(tick);
                    }
                    Err(FeedError::StreamEnded) => {
                        info!("[Feed] Tick stream ended");
                        return Ok(());
                    }
                    Err(e) => {
                        warn!("[Feed] Tick stream error: {}", e);
                        // A connection that errors before delivering a
                        // single tick must not spin through instant
                        // reconnects
                        if !delivered_since_connect {
                            tokio::time::sleep(self.backoff_base).await;
                        }
                        delivered_since_connect = false;
                        self.reconnect().await?;
                    }
                },
            }
        }
    }

    /// Connect and re-subscribe with bounded exponential backoff
    async fn reconnect(&mut self) -> FeedResult<()> {
        for attempt in 1..=self.max_reconnect_attempts {
            let _ = self
                .health_tx
                .send(FeedHealth::Reconnecting { attempt });

            match self.try_connect().await {
                Ok(()) => {
                    info!(
                        "[Feed] Connected, {} instruments subscribed (attempt {})",
                        self.symbols.len(),
                        attempt
                    );
                    let _ = self.health_tx.send(FeedHealth::Live);
                    return Ok(());
                }
                Err(e) => {
                    let backoff = self.backoff_base * 2u32.pow(attempt - 1);
                    warn!(
                        "[Feed] Connect attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, self.max_reconnect_attempts, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        warn!(
            "[Feed] Unavailable after {} attempts",
            self.max_reconnect_attempts
        );
        let _ = self.health_tx.send(FeedHealth::Unavailable);
        Err(FeedError::Unavailable(self.max_reconnect_attempts))
    }

    async fn try_connect(&mut self) -> FeedResult<()> {
        self.transport.connect().await?;
        self.transport.subscribe(&self.symbols).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;

    /// Transport driven by a script of connect results and ticks
    struct ScriptedTransport {
        connects_until_success: u32,
        connects_attempted: u32,
        tick_errors_first: u32,
        ticks: VecDeque<Tick>,
        subscribed: Vec<Symbol>,
    }

    impl ScriptedTransport {
        fn new(connects_until_success: u32, ticks: Vec<Tick>) -> Self {
            Self {
                connects_until_success,
                connects_attempted: 0,
                tick_errors_first: 0,
                ticks: ticks.into(),
                subscribed: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl TickTransport for ScriptedTransport {
        async fn connect(&mut self) -> FeedResult<()> {
            self.connects_attempted += 1;
            if self.connects_attempted >= self.connects_until_success {
                Ok(())
            } else {
                Err(FeedError::Connection("scripted failure".to_string()))
            }
        }

        async fn subscribe(&mut self, symbols: &[Symbol]) -> FeedResult<()> {
            self.subscribed = symbols.to_vec();
            Ok(())
        }

        async fn next_tick(&mut self) -> FeedResult<Tick> {
            if self.tick_errors_first > 0 {
                self.tick_errors_first -= 1;
                return Err(FeedError::Connection("scripted drop".to_string()));
            }
            match self.ticks.pop_front() {
                Some(t) => Ok(t),
                None => Err(FeedError::StreamEnded),
            }
        }
    }

    fn nifty_tick(price: rust_decimal::Decimal) -> Tick {
        Tick {
            symbol: "NIFTY".to_string(),
            price,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_reach_cache_and_subscribers() {
        let transport = ScriptedTransport::new(1, vec![nifty_tick(dec!(24000)), nifty_tick(dec!(24010))]);
        let feed = MarketDataFeed::new(Box::new(transport), vec!["NIFTY".to_string()], 3);
        let mut ticks = feed.subscribe_ticks();
        let cache = feed.cache();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(feed.run(shutdown_rx));

        let first = ticks.recv().await.unwrap();
        assert_eq!(first.price, dec!(24000));
        let second = ticks.recv().await.unwrap();
        assert_eq!(second.price, dec!(24010));
        assert_eq!(cache.get("NIFTY").unwrap().price, dec!(24010));

        // A drained stream terminates the feed cleanly, no reconnect churn
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_attempt_budget() {
        // Fails twice, connects on the third attempt
        let transport = ScriptedTransport::new(3, vec![nifty_tick(dec!(24000))]);
        let feed = MarketDataFeed::new(Box::new(transport), vec!["NIFTY".to_string()], 3);
        let mut ticks = feed.subscribe_ticks();
        let mut health = feed.health();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(feed.run(shutdown_rx));

        let tick = ticks.recv().await.unwrap();
        assert_eq!(tick.price, dec!(24000));

        health.mark_unchanged();
        assert_eq!(*health.borrow(), FeedHealth::Live);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_stream_error_reconnects_and_resumes() {
        // Stream drops before delivering anything, then serves one tick
        // after the reconnect
        let mut transport = ScriptedTransport::new(1, vec![nifty_tick(dec!(24000))]);
        transport.tick_errors_first = 1;
        let feed = MarketDataFeed::new(Box::new(transport), vec!["NIFTY".to_string()], 3);
        let mut ticks = feed.subscribe_ticks();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(feed.run(shutdown_rx));

        let tick = ticks.recv().await.unwrap();
        assert_eq!(tick.price, dec!(24000));
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_after_exhausted_attempts() {
        // Never connects
        let transport = ScriptedTransport::new(u32::MAX, vec![]);
        let feed = MarketDataFeed::new(Box::new(transport), vec!["NIFTY".to_string()], 3);
        let health = feed.health();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let result = feed.run(shutdown_rx).await;
        assert!(matches!(result, Err(FeedError::Unavailable(3))));
        assert_eq!(*health.borrow(), FeedHealth::Unavailable);
    }
}
