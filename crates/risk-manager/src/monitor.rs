//! The risk monitor

use std::sync::Arc;

use chrono::NaiveDate;
use log::{error, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::verdict::{LiquidateReason, MarketState, RiskVerdict, Veto, VetoReason};
use vega_core::{
    CloseReason, IntentKind, LegSide, OrderIntent, Quantity, StrategyConfig, Timestamp,
};
use vega_feed::FeedHealth;
use vega_ledger::PositionLedger;

/// Rough SPAN-plus-exposure margin per unit of short option quantity,
/// as a fraction of strike notional
const SHORT_MARGIN_FACTOR: Decimal = dec!(0.15);

/// Evaluates risk limits against the ledger and market state
pub struct RiskMonitor {
    config: Arc<StrategyConfig>,
}

impl RiskMonitor {
    pub fn new(config: Arc<StrategyConfig>) -> Self {
        Self { config }
    }

    /// Global verdict for this cycle, rules in fixed priority order
    ///
    /// `today` scopes the daily loss limit: only realized PnL booked on
    /// this trading day counts against it.
    pub fn check(
        &self,
        ledger: &PositionLedger,
        market: &MarketState,
        today: NaiveDate,
    ) -> RiskVerdict {
        if let Some(vix) = market.vix {
            if vix >= self.config.vix_threshold {
                error!(
                    "[Risk] VIX {} >= threshold {}, forcing liquidation",
                    vix, self.config.vix_threshold
                );
                return RiskVerdict::ForceLiquidate(LiquidateReason::Volatility);
            }
        }

        let unrealized = ledger.unrealized_pnl();
        if unrealized <= -self.config.shutdown_loss_amount() {
            error!(
                "[Risk] Unrealized loss {} past shutdown threshold {}, forcing liquidation",
                unrealized,
                self.config.shutdown_loss_amount()
            );
            return RiskVerdict::ForceLiquidate(LiquidateReason::PortfolioLoss);
        }

        let daily = ledger.daily_pnl(today);
        if daily <= -self.config.daily_loss_limit {
            error!(
                "[Risk] Daily loss {} past limit {}, forcing liquidation",
                daily, self.config.daily_loss_limit
            );
            return RiskVerdict::ForceLiquidate(LiquidateReason::DailyLoss);
        }

        if market.feed == FeedHealth::Unavailable {
            warn!("[Risk] Feed unavailable, pausing decisioning");
            return RiskVerdict::Pause;
        }

        RiskVerdict::Ok
    }

    /// Per-intent screen: margin and concentration vetoes
    ///
    /// Closing and adjustment intents always pass; only exposure-adding
    /// intents are screened. Intents are considered in emission order and
    /// the margin projection accumulates across them.
    pub fn screen(
        &self,
        ledger: &PositionLedger,
        market: &MarketState,
        intents: &[OrderIntent],
    ) -> Vec<Veto> {
        let mut vetoes = Vec::new();
        let mut projected_extra = Decimal::ZERO;

        for intent in intents {
            if intent.is_closing() || intent.is_adjustment() {
                continue;
            }

            if let Some(reason) = self.screen_one(ledger, market, intent, &mut projected_extra) {
                warn!(
                    "[Risk] Vetoing intent {} (seq {}): {}",
                    intent.correlation_id, intent.sequence, reason
                );
                vetoes.push(Veto {
                    correlation_id: intent.correlation_id,
                    reason,
                });
            }
        }
        vetoes
    }

    fn screen_one(
        &self,
        ledger: &PositionLedger,
        market: &MarketState,
        intent: &OrderIntent,
        projected_extra: &mut Decimal,
    ) -> Option<VetoReason> {
        // Margin: project utilization after this intent's estimated need
        if let (Some(used), Some(available)) = (market.margin_used, market.margin_available) {
            let total = used + available;
            if !total.is_zero() {
                let need = self.estimated_margin(intent);
                let projected = (used + *projected_extra + need) / total;
                if projected > self.config.max_utilization() {
                    return Some(VetoReason::Margin);
                }
                *projected_extra += need;
            }
        }

        // Concentration: quantity share at the intent's strike
        if matches!(intent.kind, IntentKind::OpenSell) {
            let strike = intent.contract.strike;
            let mut at_strike = intent.quantity;
            let mut total: Quantity = intent.quantity;
            for leg in ledger.active_legs() {
                total += leg.quantity;
                if leg.contract.strike == strike {
                    at_strike += leg.quantity;
                }
            }
            if !total.is_zero() && at_strike / total > self.config.concentration_limit {
                // A lone first entry is always fully concentrated; only
                // veto once there is something else on the book
                if ledger.active_count() > 0 {
                    return Some(VetoReason::Concentration);
                }
            }
        }

        None
    }

    fn estimated_margin(&self, intent: &OrderIntent) -> Decimal {
        match intent.kind {
            // Short options carry SPAN-like margin
            IntentKind::OpenSell => {
                intent.quantity * intent.contract.strike * SHORT_MARGIN_FACTOR
            }
            // Long hedges only cost their premium, approximated by limit
            // price when present
            IntentKind::OpenHedge { .. } => intent
                .limit_price
                .map(|p| p * intent.quantity)
                .unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }

    /// Synthetic intent set closing every open leg at market
    ///
    /// Sells are closed before hedges so the book is never left short and
    /// unprotected mid-liquidation.
    pub fn liquidation_intents(
        &self,
        ledger: &PositionLedger,
        next_sequence: &mut u64,
        now: Timestamp,
    ) -> Vec<OrderIntent> {
        let mut legs: Vec<_> = ledger.active_legs().collect();
        legs.sort_by_key(|l| match l.side {
            LegSide::Sell => 0,
            LegSide::HedgeBuy => 1,
        });

        legs.into_iter()
            .map(|leg| {
                let seq = *next_sequence;
                *next_sequence += 1;
                OrderIntent::new(
                    seq,
                    IntentKind::CloseLeg {
                        leg: leg.id,
                        reason: CloseReason::ForceLiquidate,
                    },
                    leg.contract.clone(),
                    leg.quantity,
                    now,
                )
            })
            .collect()
    }
}
