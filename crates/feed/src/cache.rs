//! Concurrent last-tick cache

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;

use crate::tick::Tick;
use vega_core::{Price, Symbol, Timestamp};

/// Thread-safe store of the most recent tick per instrument
///
/// Consumers must treat entries as possibly stale: there is no backfill
/// after a feed outage, so every read that feeds a trading decision goes
/// through `fresh_price` with the configured staleness bound.
pub struct QuoteCache {
    quotes: Arc<DashMap<Symbol, Tick>>,
}

impl QuoteCache {
    pub fn new() -> Self {
        Self {
            quotes: Arc::new(DashMap::new()),
        }
    }

    /// Store the latest tick, discarding out-of-order updates
    pub fn update(&self, tick: Tick) {
        match self.quotes.entry(tick.symbol.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                if entry.get().timestamp <= tick.timestamp {
                    entry.insert(tick);
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(tick);
            }
        }
    }

    /// Last tick for an instrument, regardless of age
    pub fn get(&self, symbol: &str) -> Option<Tick> {
        self.quotes.get(symbol).map(|t| t.value().clone())
    }

    /// Last price if the cached tick is no older than `max_age` at `now`
    pub fn fresh_price(&self, symbol: &str, now: Timestamp, max_age: Duration) -> Option<Price> {
        let tick = self.get(symbol)?;
        if now - tick.timestamp > max_age {
            return None;
        }
        Some(tick.price)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl Default for QuoteCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for QuoteCache {
    fn clone(&self) -> Self {
        Self {
            quotes: Arc::clone(&self.quotes),
        }
    }
}
