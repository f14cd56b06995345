//! The serialized decision loop
//!
//! One `TradingRunner` owns the engine, the ledger, and the cadence.
//! Every `evaluate_interval_ms` it runs a full cycle to completion:
//! risk check, evaluation, per-intent screen, dispatch. Cycles never
//! overlap, so the ledger needs no locking and the intent sequence
//! stays totally ordered.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use vega_core::{LegSide, PortfolioSnapshot, Price, StrategyConfig, Timestamp};
use vega_expiry::{ExpiryCalendar, ExpiryManager};
use vega_feed::{FeedHealth, QuoteCache};
use vega_ledger::PositionLedger;
use vega_order_manager::{OrderError, OrderManager};
use vega_ports::{BrokerClient, BrokerError, Clock, JournalSink, SessionProvider};
use vega_risk_manager::{LiquidateReason, MarketState, RiskMonitor, RiskVerdict};
use vega_strategy::{EngineState, StrategyEngine, variant_for};

const DEFAULT_VIX_SYMBOL: &str = "INDIAVIX";

/// Owns the whole decision side of the system and drives it on a timer
pub struct TradingRunner {
    config: Arc<StrategyConfig>,
    engine: StrategyEngine,
    ledger: PositionLedger,
    orders: OrderManager,
    risk: RiskMonitor,
    quotes: QuoteCache,
    health: watch::Receiver<FeedHealth>,
    broker: Arc<dyn BrokerClient>,
    clock: Arc<dyn Clock>,
    journal: Arc<dyn JournalSink>,
    session: Arc<dyn SessionProvider>,
    vix_symbol: String,
}

impl TradingRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<StrategyConfig>,
        broker: Arc<dyn BrokerClient>,
        clock: Arc<dyn Clock>,
        journal: Arc<dyn JournalSink>,
        session: Arc<dyn SessionProvider>,
        quotes: QuoteCache,
        health: watch::Receiver<FeedHealth>,
    ) -> Self {
        let calendar = ExpiryCalendar::weekly_thursday();
        let expiry = ExpiryManager::new(calendar, Arc::clone(&config));
        let engine = StrategyEngine::new(
            Arc::clone(&config),
            variant_for(config.mode),
            expiry,
        );
        let orders = OrderManager::new(
            Arc::clone(&broker),
            Arc::clone(&clock),
            Arc::clone(&journal),
            quotes.clone(),
            Arc::clone(&config),
        );
        let risk = RiskMonitor::new(Arc::clone(&config));

        Self {
            config,
            engine,
            ledger: PositionLedger::new(),
            orders,
            risk,
            quotes,
            health,
            broker,
            clock,
            journal,
            session,
            vix_symbol: DEFAULT_VIX_SYMBOL.to_string(),
        }
    }

    /// Volatility index symbol looked up in the quote cache
    pub fn with_vix_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.vix_symbol = symbol.into();
        self
    }

    /// Resume from a previously persisted ledger snapshot
    pub fn with_ledger(mut self, ledger: PositionLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Run until shutdown is signalled
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), BrokerError> {
        let handle = self.session.acquire().await?;
        info!("[Runner] Session {} established", handle.session_id);

        let mut cycle =
            tokio::time::interval(Duration::from_millis(self.config.evaluate_interval_ms));
        cycle.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut snapshot =
            tokio::time::interval(Duration::from_secs(self.config.snapshot_interval_secs));
        snapshot.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip the immediate first snapshot tick
        snapshot.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("[Runner] Shutdown requested");
                        return Ok(());
                    }
                }
                _ = cycle.tick() => self.cycle().await,
                _ = snapshot.tick() => self.write_snapshot().await,
            }
        }
    }

    /// One full decision cycle, run to completion
    pub async fn cycle(&mut self) {
        let now = self.clock.now();
        let health = *self.health.borrow();
        if health == FeedHealth::Live {
            self.engine.on_connected();
        }

        // A tripped breaker keeps the engine locked until the cool-down
        // lets a probe through
        if self.engine.state() == EngineState::Locked {
            if !self.orders.breaker_allows().await {
                debug!("[Runner] Breaker still open, cycle skipped");
                return;
            }
            self.engine.unlock();
        }

        let market = self.market_state(health, now).await;
        match self.risk.check(&self.ledger, &market, now.date_naive()) {
            RiskVerdict::Pause => (),
            RiskVerdict::ForceLiquidate(reason) => self.liquidate(reason, now).await,
            RiskVerdict::Ok => self.decide(&market, now).await,
        }
    }

    async fn decide(&mut self, market: &MarketState, now: Timestamp) {
        let intents = self.engine.evaluate(&mut self.ledger, &self.quotes, now);
        if intents.is_empty() {
            return;
        }

        let vetoes = self.risk.screen(&self.ledger, market, &intents);
        let vetoed: HashSet<Uuid> = vetoes.iter().map(|v| v.correlation_id).collect();

        for intent in &intents {
            if vetoed.contains(&intent.correlation_id) {
                continue;
            }
            match self.orders.execute(intent, &mut self.ledger).await {
                Ok(report) => debug!("[Runner] Intent {}: {:?}", intent.sequence, report),
                Err(OrderError::CircuitOpen) => {
                    // No stop may fire unattended while the engine is
                    // locked and nothing reconciles fills
                    self.orders.cancel_resting_stops(&mut self.ledger).await;
                    self.engine.lock();
                    return;
                }
                Err(e) => {
                    // The intent is dropped; the condition that produced it
                    // re-fires next cycle with a fresh correlation id
                    warn!("[Runner] Intent {} failed: {}", intent.correlation_id, e);
                }
            }
        }
        self.engine.on_reconciled();
    }

    async fn liquidate(&mut self, reason: LiquidateReason, now: Timestamp) {
        error!("[Runner] Force liquidation ({})", reason);
        self.engine.begin_liquidation();
        // Pending orders first, then the positions
        self.orders.cancel_resting_stops(&mut self.ledger).await;

        let mut sequence = self.engine.sequence() + 1;
        let intents = self
            .risk
            .liquidation_intents(&self.ledger, &mut sequence, now);
        for intent in &intents {
            if let Err(e) = self.orders.execute(intent, &mut self.ledger).await {
                error!(
                    "[Runner] Liquidation close {} failed: {}",
                    intent.contract.symbol, e
                );
            }
        }
        info!(
            "[Runner] Liquidation done, {} legs remain active",
            self.ledger.active_count()
        );
        self.engine.on_liquidated();
    }

    async fn market_state(&self, health: FeedHealth, now: Timestamp) -> MarketState {
        let max_age = chrono::Duration::seconds(self.config.quote_staleness_secs);
        let vix = self.quotes.fresh_price(&self.vix_symbol, now, max_age);
        let spot = self.quotes.fresh_price(&self.config.underlying, now, max_age);

        let (margin_used, margin_available) = match self.broker.margin_available().await {
            Ok(available) => {
                let used = (self.config.capital_allocated - available).max(Decimal::ZERO);
                (Some(used), Some(available))
            }
            Err(e) => {
                warn!("[Runner] Margin query failed: {}", e);
                (None, None)
            }
        };

        MarketState {
            vix,
            spot,
            feed: health,
            margin_used,
            margin_available,
        }
    }

    async fn write_snapshot(&self) {
        let now = self.clock.now();
        let exposure_ratio = match self.broker.margin_available().await {
            Ok(available) if !self.config.capital_allocated.is_zero() => {
                (self.config.capital_allocated - available).max(Decimal::ZERO)
                    / self.config.capital_allocated
            }
            _ => Decimal::ZERO,
        };
        // Resting stop-loss orders are the only open broker orders between
        // cycles
        let pending_orders = self
            .ledger
            .active_legs()
            .filter(|l| l.stop_trigger.is_some())
            .count();

        self.journal
            .snapshot(PortfolioSnapshot {
                timestamp: now,
                active_legs: self.ledger.active_count(),
                pending_orders,
                realized_pnl: self.ledger.realized_pnl(),
                unrealized_pnl: self.ledger.unrealized_pnl(),
                breakeven_estimate: self.breakeven_estimate(),
                exposure_ratio,
            })
            .await;
    }

    /// Net premium collected per unit of short quantity
    fn breakeven_estimate(&self) -> Option<Price> {
        let mut credit = Decimal::ZERO;
        let mut sell_quantity = Decimal::ZERO;
        for leg in self.ledger.active_legs() {
            match leg.side {
                LegSide::Sell => {
                    credit += leg.entry_premium * leg.quantity;
                    sell_quantity += leg.quantity;
                }
                LegSide::HedgeBuy => credit -= leg.entry_premium * leg.quantity,
            }
        }
        if sell_quantity.is_zero() {
            None
        } else {
            Some(credit / sell_quantity)
        }
    }
}
