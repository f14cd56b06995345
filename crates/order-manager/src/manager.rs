//! Order submission, reconciliation, and ledger write-back

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::breaker::{BreakerState, CircuitBreaker};
use crate::error::{OrderError, Result};
use crate::rate_limit::RateLimiter;
use rust_decimal::Decimal;
use vega_core::{
    CloseReason, IntentKind, JournalRecord, LegId, LegSide, OrderIntent, Price, StrategyConfig,
    TransactionSide,
};
use vega_feed::QuoteCache;
use vega_ledger::PositionLedger;
use vega_ports::{BrokerClient, BrokerError, BrokerOrder, Clock, JournalSink, OrderRequest, OrderState};

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome of executing one intent
#[derive(Debug)]
pub enum ExecutionReport {
    /// Correlation id already applied; nothing was sent
    AlreadyApplied,
    /// A new leg was opened
    Opened { leg: LegId, premium: Price },
    /// A stop-loss trigger is in place
    StopSet { leg: LegId, trigger: Price },
    /// A leg was closed
    Closed {
        leg: LegId,
        reason: CloseReason,
        realized: Decimal,
    },
    /// A leg was closed and reopened at a later expiry
    Rolled {
        closed: LegId,
        opened: LegId,
        realized: Decimal,
    },
}

/// Executes order intents against the broker and reconciles the ledger
pub struct OrderManager {
    broker: Arc<dyn BrokerClient>,
    clock: Arc<dyn Clock>,
    journal: Arc<dyn JournalSink>,
    quotes: QuoteCache,
    config: Arc<StrategyConfig>,
    breaker: Mutex<CircuitBreaker>,
    rate: RateLimiter,
}

impl OrderManager {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        clock: Arc<dyn Clock>,
        journal: Arc<dyn JournalSink>,
        quotes: QuoteCache,
        config: Arc<StrategyConfig>,
    ) -> Self {
        let breaker = CircuitBreaker::new(
            config.max_consecutive_failures,
            chrono::Duration::seconds(config.breaker_cooldown_secs as i64),
        );
        let rate = RateLimiter::new(Duration::from_millis(config.rate_limit_ms));
        Self {
            broker,
            clock,
            journal,
            quotes,
            config,
            breaker: Mutex::new(breaker),
            rate,
        }
    }

    pub async fn breaker_state(&self) -> BreakerState {
        self.breaker.lock().await.state()
    }

    /// True if the breaker would let a submission through right now
    ///
    /// Moves an open breaker to half-open once its cool-down has elapsed,
    /// so callers can use this to decide whether to resume decisioning.
    pub async fn breaker_allows(&self) -> bool {
        self.breaker.lock().await.permit(self.clock.now())
    }

    /// Operator reset of the circuit breaker
    pub async fn reset_breaker(&self) {
        self.breaker.lock().await.reset();
    }

    /// Execute one intent to completion, applying the result to the ledger
    pub async fn execute(
        &self,
        intent: &OrderIntent,
        ledger: &mut PositionLedger,
    ) -> Result<ExecutionReport> {
        if ledger.is_applied(intent.correlation_id) {
            info!(
                "[OM] Intent {} (seq {}) already applied, skipping",
                intent.correlation_id, intent.sequence
            );
            return Ok(ExecutionReport::AlreadyApplied);
        }

        match &intent.kind {
            IntentKind::OpenSell => self.open_leg(intent, None, ledger).await,
            IntentKind::OpenHedge { covers } => self.open_leg(intent, Some(*covers), ledger).await,
            IntentKind::SetStopLoss { leg, trigger } => {
                self.set_stop_loss(intent, *leg, *trigger, ledger).await
            }
            IntentKind::CloseLeg { leg, reason } => {
                self.close_leg(intent, *leg, *reason, ledger).await
            }
            IntentKind::Rollover { leg, to_expiry } => {
                self.rollover(intent, *leg, *to_expiry, ledger).await
            }
        }
    }

    async fn open_leg(
        &self,
        intent: &OrderIntent,
        covers: Option<LegId>,
        ledger: &mut PositionLedger,
    ) -> Result<ExecutionReport> {
        let side = match covers {
            None => TransactionSide::Sell,
            Some(_) => TransactionSide::Buy,
        };
        let request = OrderRequest {
            correlation_id: intent.correlation_id,
            symbol: intent.contract.symbol.clone(),
            side,
            quantity: intent.quantity,
            limit_price: intent.limit_price,
            trigger_price: None,
        };

        let order = self.submit_to_fill(request).await?;
        let premium = order.average_premium.unwrap_or_default();
        let now = self.clock.now();

        let mut leg = match covers {
            None => ledger.open_sell(
                intent.contract.clone(),
                intent.quantity,
                premium,
                intent.correlation_id,
                now,
            )?,
            Some(sell_id) => ledger.open_hedge(
                intent.contract.clone(),
                intent.quantity,
                premium,
                sell_id,
                intent.correlation_id,
                now,
            )?,
        };

        // Sized hedges at the same contract fold into one leg
        if covers.is_some() && !self.config.hedge_one_lot {
            if let Some(survivor) = ledger.consolidate_hedges(&intent.contract.symbol, now) {
                info!(
                    "[OM] Consolidated hedges on {} into {}",
                    intent.contract.symbol, survivor
                );
                leg = survivor;
            }
        }

        self.journal_fill(&order, "FILLED").await;
        info!(
            "[OM] Opened {} leg {} at {} ({} qty)",
            side.as_str(),
            leg,
            premium,
            intent.quantity
        );
        Ok(ExecutionReport::Opened { leg, premium })
    }

    async fn set_stop_loss(
        &self,
        intent: &OrderIntent,
        leg_id: LegId,
        trigger: Price,
        ledger: &mut PositionLedger,
    ) -> Result<ExecutionReport> {
        let side = self.closing_side(leg_id, ledger)?;
        let request = OrderRequest {
            correlation_id: intent.correlation_id,
            symbol: intent.contract.symbol.clone(),
            side,
            quantity: intent.quantity,
            limit_price: None,
            trigger_price: Some(trigger),
        };

        // SL orders rest at the broker; only the placement is awaited
        self.check_breaker().await?;
        let order_id = self.place_with_retries(&request).await?;
        ledger.set_stop(leg_id, trigger, order_id.clone())?;

        let now = self.clock.now();
        self.journal
            .record(JournalRecord {
                timestamp: now,
                order_id,
                correlation_id: intent.correlation_id,
                symbol: intent.contract.symbol.clone(),
                side: side.as_str().to_string(),
                quantity: intent.quantity,
                premium: trigger,
                status: "SL_SET".to_string(),
                spot: self.spot(),
            })
            .await;

        info!("[OM] Stop-loss set on leg {} at {}", leg_id, trigger);
        Ok(ExecutionReport::StopSet {
            leg: leg_id,
            trigger,
        })
    }

    async fn close_leg(
        &self,
        intent: &OrderIntent,
        leg_id: LegId,
        reason: CloseReason,
        ledger: &mut PositionLedger,
    ) -> Result<ExecutionReport> {
        // The resting stop must come off before the exit order goes in,
        // or both could fill against the same position
        self.cancel_resting_stop(leg_id, ledger).await;
        let side = self.closing_side(leg_id, ledger)?;
        let request = OrderRequest {
            correlation_id: intent.correlation_id,
            symbol: intent.contract.symbol.clone(),
            side,
            quantity: intent.quantity,
            limit_price: intent.limit_price,
            trigger_price: None,
        };

        let order = self.submit_to_fill(request).await?;
        let premium = order.average_premium.unwrap_or_default();
        let realized = ledger.close_leg(leg_id, premium, intent.correlation_id, self.clock.now())?;

        self.journal_fill(&order, "FILLED").await;
        info!(
            "[OM] Closed leg {} ({}) at {}, realized {}",
            leg_id, reason, premium, realized
        );
        Ok(ExecutionReport::Closed {
            leg: leg_id,
            reason,
            realized,
        })
    }

    async fn rollover(
        &self,
        intent: &OrderIntent,
        leg_id: LegId,
        to_expiry: chrono::NaiveDate,
        ledger: &mut PositionLedger,
    ) -> Result<ExecutionReport> {
        // The closing half claims the intent's correlation id, so a replay
        // of the whole intent is a no-op before any broker contact. The
        // rolled marker goes on only after the close fills: a failed close
        // leaves the leg unmarked and the roll re-fires next cycle.
        let closed = self
            .close_leg(intent, leg_id, CloseReason::Rollover, ledger)
            .await?;
        ledger.mark_rolled(leg_id)?;
        let realized = match closed {
            ExecutionReport::Closed { realized, .. } => realized,
            _ => Decimal::ZERO,
        };

        let contract = intent.contract.at_expiry(to_expiry);
        let request = OrderRequest {
            correlation_id: Uuid::new_v4(),
            symbol: contract.symbol.clone(),
            side: TransactionSide::Sell,
            quantity: intent.quantity,
            limit_price: None,
            trigger_price: None,
        };

        let order = self.submit_to_fill(request).await?;
        let premium = order.average_premium.unwrap_or_default();
        let opened = ledger.open_sell(
            contract,
            intent.quantity,
            premium,
            order.correlation_id,
            self.clock.now(),
        )?;

        self.journal_fill(&order, "FILLED").await;
        info!(
            "[OM] Rolled leg {} into {} (expiry {})",
            leg_id, opened, to_expiry
        );
        Ok(ExecutionReport::Rolled {
            closed: leg_id,
            opened,
            realized,
        })
    }

    /// Best-effort cancel of a leg's resting stop-loss order
    ///
    /// The ledger forgets the order id either way; a cancel that fails
    /// against a broker that already dropped the order is not an error
    /// worth failing the close over.
    async fn cancel_resting_stop(&self, leg_id: LegId, ledger: &mut PositionLedger) {
        let Some(order_id) = ledger.clear_stop_order(leg_id) else {
            return;
        };
        self.rate.acquire().await;
        match self.broker.cancel_order(&order_id).await {
            Ok(()) => info!("[OM] Cancelled resting stop {} for leg {}", order_id, leg_id),
            Err(e) => warn!(
                "[OM] Could not cancel resting stop {} for leg {}: {}",
                order_id, leg_id, e
            ),
        }
    }

    /// Cancel every resting stop-loss order on the book
    ///
    /// Used when decisioning halts (breaker trip, forced liquidation) so
    /// no stop fires unattended while the engine is not reconciling fills.
    pub async fn cancel_resting_stops(&self, ledger: &mut PositionLedger) {
        let legs: Vec<LegId> = ledger
            .active_legs()
            .filter(|l| l.stop_order_id.is_some())
            .map(|l| l.id)
            .collect();
        for leg_id in legs {
            self.cancel_resting_stop(leg_id, ledger).await;
        }
    }

    fn closing_side(&self, leg_id: LegId, ledger: &PositionLedger) -> Result<TransactionSide> {
        let leg = ledger
            .leg(leg_id)
            .ok_or(OrderError::Ledger(vega_ledger::LedgerError::UnknownLeg(
                leg_id,
            )))?;
        Ok(match leg.side {
            LegSide::Sell => TransactionSide::Buy,
            LegSide::HedgeBuy => TransactionSide::Sell,
        })
    }

    /// Submit an order and wait for a terminal fill, falling back from
    /// market to limit pricing on broker rejection
    async fn submit_to_fill(&self, request: OrderRequest) -> Result<BrokerOrder> {
        self.check_breaker().await?;

        let order = match self.place_and_reconcile(&request).await {
            Ok(order) => order,
            Err(OrderError::Rejected { reason, .. }) if request.limit_price.is_none() => {
                // Market order refused; retry once as a limit order priced
                // inside the configured band around the last traded price
                let ltp = self.last_price(&request.symbol).await?;
                let band = ltp * self.config.limit_fallback_band;
                let limit = match request.side {
                    TransactionSide::Buy => ltp + band,
                    TransactionSide::Sell => ltp - band,
                };
                warn!(
                    "[OM] Market order for {} rejected ({}), retrying limit at {}",
                    request.symbol, reason, limit
                );
                let fallback = OrderRequest {
                    limit_price: Some(limit),
                    ..request.clone()
                };
                self.place_and_reconcile(&fallback).await?
            }
            Err(e) => return Err(e),
        };

        let mut breaker = self.breaker.lock().await;
        breaker.record_success();
        Ok(order)
    }

    async fn place_and_reconcile(&self, request: &OrderRequest) -> Result<BrokerOrder> {
        let order_id = self.place_with_retries(request).await?;
        let order = self.await_terminal(&order_id).await?;
        match order.state {
            OrderState::Filled => Ok(order),
            OrderState::Rejected => {
                self.record_failure().await;
                Err(OrderError::Rejected {
                    order_id,
                    reason: "broker rejected".to_string(),
                })
            }
            OrderState::Cancelled => {
                self.record_failure().await;
                Err(OrderError::Rejected {
                    order_id,
                    reason: "cancelled before fill".to_string(),
                })
            }
            _ => Err(OrderError::ReconcileTimeout { order_id }),
        }
    }

    /// Place an order with exponential backoff on transient errors
    async fn place_with_retries(&self, request: &OrderRequest) -> Result<String> {
        let mut backoff = Duration::from_secs(self.config.retry_backoff_secs);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.rate.acquire().await;
            match self.broker.place_order(request).await {
                Ok(order_id) => return Ok(order_id),
                Err(e) if e.is_transient() && attempt < self.config.max_order_retries => {
                    self.record_failure().await;
                    warn!(
                        "[OM] Attempt {}/{} for {} failed: {}, retrying in {:?}",
                        attempt, self.config.max_order_retries, request.symbol, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) if e.is_transient() => {
                    self.record_failure().await;
                    return Err(OrderError::RetriesExhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    self.record_failure().await;
                    if let BrokerError::Rejected(reason) = e {
                        return Err(OrderError::Rejected {
                            order_id: String::new(),
                            reason,
                        });
                    }
                    return Err(OrderError::Broker(e));
                }
            }
        }
    }

    /// Poll order status until it reaches a terminal state or the submit
    /// deadline passes; a timed-out order is cancelled best-effort
    async fn await_terminal(&self, order_id: &str) -> Result<BrokerOrder> {
        let deadline = Duration::from_secs(self.config.submit_timeout_secs);
        let poll = async {
            loop {
                match self.broker.order_status(order_id).await {
                    Ok(order) if order.state.is_terminal() => return Ok(order),
                    Ok(_) => tokio::time::sleep(STATUS_POLL_INTERVAL).await,
                    Err(e) if e.is_transient() => {
                        tokio::time::sleep(STATUS_POLL_INTERVAL).await;
                    }
                    Err(e) => return Err(OrderError::Broker(e)),
                }
            }
        };

        match tokio::time::timeout(deadline, poll).await {
            Ok(result) => result,
            Err(_) => {
                warn!("[OM] Order {} not terminal within deadline, cancelling", order_id);
                let _ = self.broker.cancel_order(order_id).await;
                self.record_failure().await;
                Err(OrderError::ReconcileTimeout {
                    order_id: order_id.to_string(),
                })
            }
        }
    }

    async fn check_breaker(&self) -> Result<()> {
        let mut breaker = self.breaker.lock().await;
        if breaker.permit(self.clock.now()) {
            Ok(())
        } else {
            Err(OrderError::CircuitOpen)
        }
    }

    async fn record_failure(&self) {
        self.breaker.lock().await.record_failure(self.clock.now());
    }

    async fn last_price(&self, symbol: &str) -> Result<Price> {
        let now = self.clock.now();
        let max_age = chrono::Duration::seconds(self.config.quote_staleness_secs);
        if let Some(price) = self.quotes.fresh_price(symbol, now, max_age) {
            return Ok(price);
        }
        // Cache miss or stale: ask the broker directly
        self.rate.acquire().await;
        match self.broker.quote(symbol).await {
            Ok(quote) => Ok(quote.last_price),
            Err(_) => Err(OrderError::StaleQuote(symbol.to_string())),
        }
    }

    fn spot(&self) -> Option<Price> {
        let now = self.clock.now();
        let max_age = chrono::Duration::seconds(self.config.quote_staleness_secs);
        self.quotes
            .fresh_price(&self.config.underlying, now, max_age)
    }

    async fn journal_fill(&self, order: &BrokerOrder, status: &str) {
        self.journal
            .record(JournalRecord {
                timestamp: order.updated_at,
                order_id: order.order_id.clone(),
                correlation_id: order.correlation_id,
                symbol: order.symbol.clone(),
                side: order.side.as_str().to_string(),
                quantity: order.filled_quantity,
                premium: order.average_premium.unwrap_or_default(),
                status: status.to_string(),
                spot: self.spot(),
            })
            .await;
    }
}
