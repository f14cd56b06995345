//! The decision engine

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, info, warn};
use rust_decimal_macros::dec;

use crate::state::EngineState;
use crate::variant::StrategyVariant;
use vega_core::{
    CloseReason, IntentKind, Leg, LegId, LegSide, OptionContract, OptionKind, OrderIntent, Price,
    StrategyConfig, Timestamp, nearest_strike,
};
use vega_expiry::{ExpiryManager, RolloverAction};
use vega_feed::QuoteCache;
use vega_ledger::PositionLedger;

/// Tick-driven decision engine over one option chain
///
/// `evaluate` is pure computation: it reads the ledger and quote cache,
/// mutates only engine-local state plus leg markers, and returns the
/// intents for this cycle in their dispatch order.
pub struct StrategyEngine {
    config: Arc<StrategyConfig>,
    variant: Box<dyn StrategyVariant>,
    expiry: ExpiryManager,
    state: EngineState,
    sequence: u64,
}

impl StrategyEngine {
    pub fn new(
        config: Arc<StrategyConfig>,
        variant: Box<dyn StrategyVariant>,
        expiry: ExpiryManager,
    ) -> Self {
        Self {
            config,
            variant,
            expiry,
            state: EngineState::Idle,
            sequence: 0,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Feed is live
    pub fn on_connected(&mut self) {
        if self.state == EngineState::Idle {
            info!("[Engine] Connected ({})", self.variant.name());
            self.state = EngineState::Connected;
        }
    }

    /// All intents of the current cycle reached a terminal state
    pub fn on_reconciled(&mut self) {
        if self.state == EngineState::OrderPending {
            self.state = EngineState::Reconciled;
        }
    }

    /// Circuit breaker tripped: no decisions until unlocked
    pub fn lock(&mut self) {
        warn!("[Engine] Locked");
        self.state = EngineState::Locked;
    }

    /// Breaker closed again
    pub fn unlock(&mut self) {
        if self.state == EngineState::Locked {
            info!("[Engine] Unlocked");
            self.state = EngineState::Monitoring;
        }
    }

    /// Risk-triggered shutdown begins
    pub fn begin_liquidation(&mut self) {
        warn!("[Engine] Liquidating");
        self.state = EngineState::Liquidating;
    }

    /// Liquidation finished, back to idle
    pub fn on_liquidated(&mut self) {
        if self.state == EngineState::Liquidating {
            self.state = EngineState::Idle;
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn intent(
        &mut self,
        kind: IntentKind,
        contract: OptionContract,
        quantity: rust_decimal::Decimal,
        now: Timestamp,
    ) -> OrderIntent {
        let seq = self.next_seq();
        OrderIntent::new(seq, kind, contract, quantity, now)
    }

    /// One evaluation cycle
    ///
    /// Trigger order is fixed: entry (and entry wings), expiry rollover,
    /// per-leg profit cascade and stop-loss, hedge deterioration, hedge
    /// touch, orphan cleanup, side-level profit-points exit.
    pub fn evaluate(
        &mut self,
        ledger: &mut PositionLedger,
        quotes: &QuoteCache,
        now: Timestamp,
    ) -> Vec<OrderIntent> {
        if !self.state.can_evaluate() {
            debug!("[Engine] Skipping cycle in state {:?}", self.state);
            return Vec::new();
        }
        self.state = EngineState::Evaluating;

        if !self.config.calendar.is_open(now) {
            debug!("[Engine] Outside trading window");
            self.state = EngineState::Monitoring;
            return Vec::new();
        }

        let max_age = chrono::Duration::seconds(self.config.quote_staleness_secs);
        self.refresh_marks(ledger, quotes, now, max_age);
        let spot = quotes.fresh_price(&self.config.underlying, now, max_age);
        let today = now.date_naive();

        let mut intents = Vec::new();
        // Legs already scheduled for closing this cycle
        let mut closing: HashSet<LegId> = HashSet::new();
        let legs: Vec<Leg> = ledger.active_legs().cloned().collect();

        match spot {
            Some(spot) => {
                self.entries(ledger, &legs, spot, today, now, &mut intents);
                self.entry_wings(&legs, now, &mut intents);
            }
            None => warn!("[Engine] No fresh spot for {}", self.config.underlying),
        }

        self.rollovers(&legs, today, now, &mut intents, &mut closing);
        self.profit_cascade(&legs, now, &mut intents);
        self.stop_losses(ledger, &legs, now, &mut intents, &mut closing);
        self.hedge_deterioration(ledger, &legs, now, &mut intents);
        if let Some(spot) = spot {
            self.hedge_touch(ledger, &legs, spot, today, now, &mut intents, &mut closing);
        }
        self.orphan_cleanup(ledger, now, &mut intents, &mut closing);
        self.side_exits(ledger, &legs, now, &mut intents, &mut closing);

        self.state = if intents.is_empty() {
            EngineState::Monitoring
        } else {
            info!("[Engine] Cycle emitted {} intents", intents.len());
            EngineState::OrderPending
        };
        intents
    }

    fn refresh_marks(
        &self,
        ledger: &mut PositionLedger,
        quotes: &QuoteCache,
        now: Timestamp,
        max_age: chrono::Duration,
    ) {
        let symbols: HashSet<String> = ledger
            .active_legs()
            .map(|l| l.contract.symbol.clone())
            .collect();
        for symbol in symbols {
            if let Some(price) = quotes.fresh_price(&symbol, now, max_age) {
                ledger.mark(&symbol, price);
            }
        }
    }

    /// Open the variant's legs when the book has no active sells
    fn entries(
        &mut self,
        ledger: &PositionLedger,
        legs: &[Leg],
        spot: Price,
        today: chrono::NaiveDate,
        now: Timestamp,
        intents: &mut Vec<OrderIntent>,
    ) {
        if legs.iter().any(|l| l.side == LegSide::Sell) {
            return;
        }
        let expiry = self.expiry.calendar().next_weekly(today);
        let quantity = self.config.sell_quantity();

        for (kind, strike) in self.variant.entry_strikes(spot, &self.config) {
            let Some(strike) = self.conflict_free_strike(ledger, strike, kind) else {
                continue;
            };
            let contract = OptionContract::new(&self.config.underlying, expiry, strike, kind);
            info!("[Engine] Entry: sell {} at {}", contract.symbol, strike);
            intents.push(self.intent(IntentKind::OpenSell, contract, quantity, now));
        }
    }

    /// A sell strike colliding with an existing leg shifts one step toward
    /// spot (CE down, PE up); a second collision abandons the entry for
    /// this cycle
    fn conflict_free_strike(
        &self,
        ledger: &PositionLedger,
        strike: Price,
        kind: OptionKind,
    ) -> Option<Price> {
        let occupied = |s: Price| {
            ledger.has_active_at(s, kind, LegSide::Sell)
                || ledger.has_active_at(s, kind, LegSide::HedgeBuy)
        };
        if !occupied(strike) {
            return Some(strike);
        }
        let shifted = strike - kind.away_from_spot() * self.config.strike_step;
        if occupied(shifted) {
            warn!("[Engine] No conflict-free strike near {}, skipping entry", strike);
            None
        } else {
            Some(shifted)
        }
    }

    /// Iron-fly wings: hedge every unhedged sell right after entry
    fn entry_wings(&mut self, legs: &[Leg], now: Timestamp, intents: &mut Vec<OrderIntent>) {
        if !self.variant.hedge_at_entry() || !self.config.buy_hedge {
            return;
        }
        for leg in legs {
            if leg.side != LegSide::Sell || leg.hedged_by.is_some() {
                continue;
            }
            let contract = self.hedge_contract(leg, leg.entry_premium);
            let quantity = self.config.hedge_quantity(leg.quantity);
            debug!("[Engine] Wing for {}: buy {}", leg.id, contract.symbol);
            intents.push(self.intent(
                IntentKind::OpenHedge { covers: leg.id },
                contract,
                quantity,
                now,
            ));
        }
    }

    /// Hedge strike = sell strike moved away from spot by the premium,
    /// rounded to the strike step
    fn hedge_contract(&self, sell: &Leg, premium: Price) -> OptionContract {
        let away = sell.contract.kind.away_from_spot();
        let strike = nearest_strike(
            sell.contract.strike + away * premium,
            self.config.strike_step,
        );
        sell.contract.at_strike(strike)
    }

    /// Roll legs approaching expiry
    fn rollovers(
        &mut self,
        legs: &[Leg],
        today: chrono::NaiveDate,
        now: Timestamp,
        intents: &mut Vec<OrderIntent>,
        closing: &mut HashSet<LegId>,
    ) {
        for leg in legs {
            let action = self.expiry.next_action(leg, today);
            if action == RolloverAction::None {
                continue;
            }
            match leg.side {
                LegSide::Sell => {
                    if let Some(to_expiry) = self.expiry.target_expiry(action, leg, today) {
                        info!(
                            "[Engine] Rolling {} ({:?}) to {}",
                            leg.id, action, to_expiry
                        );
                        closing.insert(leg.id);
                        intents.push(self.intent(
                            IntentKind::Rollover {
                                leg: leg.id,
                                to_expiry,
                            },
                            leg.contract.clone(),
                            leg.quantity,
                            now,
                        ));
                    }
                }
                LegSide::HedgeBuy => {
                    // Hedges are not rolled in place; close and let the
                    // hedge rules re-establish protection at the new expiry
                    closing.insert(leg.id);
                    intents.push(self.intent(
                        IntentKind::CloseLeg {
                            leg: leg.id,
                            reason: CloseReason::ExpiryReplace,
                        },
                        leg.contract.clone(),
                        leg.quantity,
                        now,
                    ));
                }
            }
        }
    }

    /// Premium decay past the profit threshold: lock in with a stop,
    /// re-sell the strike, and (optionally) hedge the new exposure
    fn profit_cascade(
        &mut self,
        legs: &[Leg],
        now: Timestamp,
        intents: &mut Vec<OrderIntent>,
    ) {
        let threshold = self.config.profit_percentage / dec!(100);
        for leg in legs {
            if leg.side != LegSide::Sell || leg.stop_trigger.is_some() {
                continue;
            }
            if leg.decay_fraction() < threshold {
                continue;
            }

            let trigger = self.config.stop_trigger(leg.entry_premium);
            info!(
                "[Engine] Cascade on {}: decay {:.4}, stop at {}",
                leg.id,
                leg.decay_fraction(),
                trigger
            );

            intents.push(self.intent(
                IntentKind::SetStopLoss {
                    leg: leg.id,
                    trigger,
                },
                leg.contract.clone(),
                leg.quantity,
                now,
            ));
            intents.push(self.intent(
                IntentKind::OpenSell,
                leg.contract.clone(),
                self.config.sell_quantity(),
                now,
            ));
            if self.config.buy_hedge {
                let contract = self.hedge_contract(leg, leg.current_premium);
                let quantity = self.config.hedge_quantity(leg.quantity);
                intents.push(self.intent(
                    IntentKind::OpenHedge { covers: leg.id },
                    contract,
                    quantity,
                    now,
                ));
            }
        }
    }

    /// Close legs whose stop trigger has been breached
    fn stop_losses(
        &mut self,
        ledger: &mut PositionLedger,
        legs: &[Leg],
        now: Timestamp,
        intents: &mut Vec<OrderIntent>,
        closing: &mut HashSet<LegId>,
    ) {
        for leg in legs {
            if leg.side != LegSide::Sell || closing.contains(&leg.id) {
                continue;
            }
            let Some(trigger) = leg.stop_trigger else {
                continue;
            };
            if leg.status == vega_core::LegStatus::Open && leg.current_premium >= trigger {
                info!(
                    "[Engine] Stop hit on {}: {} >= {}",
                    leg.id, leg.current_premium, trigger
                );
                // Marked STOPPED so the close is not re-emitted next cycle
                if let Err(e) = ledger.mark_stopped(leg.id) {
                    warn!("[Engine] Could not mark {} stopped: {}", leg.id, e);
                }
                closing.insert(leg.id);
                intents.push(self.intent(
                    IntentKind::CloseLeg {
                        leg: leg.id,
                        reason: CloseReason::StopLoss,
                    },
                    leg.contract.clone(),
                    leg.quantity,
                    now,
                ));
            }
        }
    }

    /// A deteriorating hedge funds a new sell further out
    fn hedge_deterioration(
        &mut self,
        ledger: &PositionLedger,
        legs: &[Leg],
        now: Timestamp,
        intents: &mut Vec<OrderIntent>,
    ) {
        let threshold = self.config.profit_percentage / dec!(100);
        for leg in legs {
            if leg.side != LegSide::HedgeBuy {
                continue;
            }
            // For a long hedge, positive decay is premium lost
            if leg.decay_fraction() < threshold {
                continue;
            }
            let away = leg.contract.kind.away_from_spot();
            let strike = nearest_strike(
                leg.contract.strike + away * self.config.adjacency_gap,
                self.config.strike_step,
            );
            if ledger.has_active_at(strike, leg.contract.kind, LegSide::Sell) {
                continue;
            }
            info!(
                "[Engine] Hedge {} deteriorated, selling adjacent strike {}",
                leg.id, strike
            );
            intents.push(self.intent(
                IntentKind::OpenSell,
                leg.contract.at_strike(strike),
                self.config.sell_quantity(),
                now,
            ));
        }
    }

    /// Spot touching a hedge strike: replace with cheaper far-month cover
    /// at double quantity
    #[allow(clippy::too_many_arguments)]
    fn hedge_touch(
        &mut self,
        ledger: &PositionLedger,
        legs: &[Leg],
        spot: Price,
        today: chrono::NaiveDate,
        now: Timestamp,
        intents: &mut Vec<OrderIntent>,
        closing: &mut HashSet<LegId>,
    ) {
        for leg in legs {
            if leg.side != LegSide::HedgeBuy || closing.contains(&leg.id) {
                continue;
            }
            if !leg.contract.strike_touched(spot) {
                continue;
            }
            let Some(covers) = leg.covers else {
                continue;
            };
            // An orphan hedge gets no replacement; orphan cleanup closes it
            if !ledger.leg(covers).is_some_and(|sell| sell.is_active()) {
                continue;
            }
            info!(
                "[Engine] Spot {} touched hedge strike {}, replacing far-month",
                spot, leg.contract.strike
            );
            closing.insert(leg.id);
            intents.push(self.intent(
                IntentKind::CloseLeg {
                    leg: leg.id,
                    reason: CloseReason::HedgeTouch,
                },
                leg.contract.clone(),
                leg.quantity,
                now,
            ));

            if let Some(far) = self
                .expiry
                .calendar()
                .far_month(today, self.config.far_month_index)
            {
                let contract = leg.contract.at_expiry(far);
                let quantity = leg.quantity * dec!(2);
                let limit = leg.entry_premium / dec!(2);
                intents.push(
                    self.intent(
                        IntentKind::OpenHedge { covers },
                        contract,
                        quantity,
                        now,
                    )
                    .with_limit(limit),
                );
            }
        }
    }

    /// Close hedges whose covered sell is gone
    fn orphan_cleanup(
        &mut self,
        ledger: &PositionLedger,
        now: Timestamp,
        intents: &mut Vec<OrderIntent>,
        closing: &mut HashSet<LegId>,
    ) {
        let orphans: Vec<Leg> = ledger.orphan_hedges().into_iter().cloned().collect();
        for hedge in orphans {
            if closing.contains(&hedge.id) {
                continue;
            }
            info!("[Engine] Closing orphan hedge {}", hedge.id);
            closing.insert(hedge.id);
            intents.push(self.intent(
                IntentKind::CloseLeg {
                    leg: hedge.id,
                    reason: CloseReason::OrphanHedge,
                },
                hedge.contract.clone(),
                hedge.quantity,
                now,
            ));
        }
    }

    /// A side (CE or PE) past its profit-points target exits entirely
    fn side_exits(
        &mut self,
        ledger: &PositionLedger,
        legs: &[Leg],
        now: Timestamp,
        intents: &mut Vec<OrderIntent>,
        closing: &mut HashSet<LegId>,
    ) {
        use vega_core::OptionKind;

        for kind in [OptionKind::Call, OptionKind::Put] {
            if ledger.side_points(kind) < self.config.profit_points {
                continue;
            }
            info!(
                "[Engine] {} side reached {} points, closing the side",
                kind.as_str(),
                ledger.side_points(kind)
            );
            for leg in legs {
                if leg.contract.kind != kind || closing.contains(&leg.id) {
                    continue;
                }
                closing.insert(leg.id);
                intents.push(self.intent(
                    IntentKind::CloseLeg {
                        leg: leg.id,
                        reason: CloseReason::ProfitPoints,
                    },
                    leg.contract.clone(),
                    leg.quantity,
                    now,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::straddle::Straddle;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;
    use vega_core::OptionKind;
    use vega_expiry::ExpiryCalendar;
    use vega_feed::Tick;

    // Monday 2025-09-22, inside the trading window
    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 9, 22, 10, 0, 0).unwrap()
    }

    fn engine_with(config: StrategyConfig) -> StrategyEngine {
        let config = Arc::new(config);
        let expiry = ExpiryManager::new(ExpiryCalendar::weekly_thursday(), config.clone());
        let mut engine = StrategyEngine::new(config, Box::new(Straddle), expiry);
        engine.on_connected();
        engine
    }

    fn engine() -> StrategyEngine {
        engine_with(StrategyConfig::default())
    }

    fn quotes_with_spot(spot: rust_decimal::Decimal) -> QuoteCache {
        let quotes = QuoteCache::new();
        quotes.update(Tick {
            symbol: "NIFTY".to_string(),
            price: spot,
            timestamp: now(),
        });
        quotes
    }

    fn mark(quotes: &QuoteCache, symbol: &str, price: rust_decimal::Decimal) {
        quotes.update(Tick {
            symbol: symbol.to_string(),
            price,
            timestamp: now(),
        });
    }

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 25).unwrap()
    }

    fn seed_sell(
        ledger: &mut PositionLedger,
        strike: rust_decimal::Decimal,
        premium: rust_decimal::Decimal,
    ) -> LegId {
        let contract = OptionContract::new("NIFTY", expiry(), strike, OptionKind::Call);
        ledger
            .open_sell(contract, dec!(50), premium, Uuid::new_v4(), now())
            .unwrap()
    }

    #[test]
    fn test_entry_emits_both_sides() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        let quotes = quotes_with_spot(dec!(24013));

        let intents = engine.evaluate(&mut ledger, &quotes, now());
        assert_eq!(intents.len(), 2);
        assert!(intents.iter().all(|i| i.kind == IntentKind::OpenSell));
        assert_eq!(intents[0].contract.strike, dec!(24000));
        assert_eq!(intents[0].contract.kind, OptionKind::Call);
        assert_eq!(intents[1].contract.kind, OptionKind::Put);
        // Weekly expiry for Monday the 22nd is Thursday the 25th
        assert_eq!(intents[0].contract.expiry, expiry());
        assert_eq!(engine.state(), EngineState::OrderPending);
    }

    #[test]
    fn test_no_reentry_while_sells_active() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        seed_sell(&mut ledger, dec!(24000), dec!(100));
        let quotes = quotes_with_spot(dec!(24013));

        let intents = engine.evaluate(&mut ledger, &quotes, now());
        assert!(intents.iter().all(|i| i.kind != IntentKind::OpenSell));
    }

    #[test]
    fn test_entry_shifts_off_occupied_strike() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        // Leave an orphan hedge sitting on the ATM call strike
        let sell = seed_sell(&mut ledger, dec!(24000), dec!(100));
        let contract = OptionContract::new("NIFTY", expiry(), dec!(24000), OptionKind::Call);
        ledger
            .open_hedge(contract, dec!(50), dec!(40), sell, Uuid::new_v4(), now())
            .unwrap();
        ledger
            .close_leg(sell, dec!(100), Uuid::new_v4(), now())
            .unwrap();

        let quotes = quotes_with_spot(dec!(24000));
        let intents = engine.evaluate(&mut ledger, &quotes, now());

        let sells: Vec<_> = intents
            .iter()
            .filter(|i| i.kind == IntentKind::OpenSell)
            .collect();
        assert_eq!(sells.len(), 2);
        // Call shifts one step toward spot, put keeps the ATM strike
        assert_eq!(sells[0].contract.kind, OptionKind::Call);
        assert_eq!(sells[0].contract.strike, dec!(23950));
        assert_eq!(sells[1].contract.kind, OptionKind::Put);
        assert_eq!(sells[1].contract.strike, dec!(24000));

        // The orphan hedge is scheduled for cleanup in the same cycle,
        // not replaced via the touch rule: spot sits right on its strike,
        // but a hedge without a live sell gets no far-month successor
        assert!(intents.iter().any(|i| matches!(
            i.kind,
            IntentKind::CloseLeg {
                reason: CloseReason::OrphanHedge,
                ..
            }
        )));
        assert!(intents.iter().all(|i| !matches!(
            i.kind,
            IntentKind::CloseLeg {
                reason: CloseReason::HedgeTouch,
                ..
            }
        )));
        assert!(
            intents
                .iter()
                .all(|i| !matches!(i.kind, IntentKind::OpenHedge { .. }))
        );
    }

    #[test]
    fn test_profit_cascade_order_and_values() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        let leg = seed_sell(&mut ledger, dec!(24000), dec!(100));
        let symbol = ledger.leg(leg).unwrap().contract.symbol.clone();

        let quotes = quotes_with_spot(dec!(24013));
        mark(&quotes, &symbol, dec!(75)); // exactly 25% decay

        let intents = engine.evaluate(&mut ledger, &quotes, now());
        assert_eq!(intents.len(), 3);

        // Fixed order: stop-loss set, same-strike sell, hedge buy
        match &intents[0].kind {
            IntentKind::SetStopLoss { leg: l, trigger } => {
                assert_eq!(*l, leg);
                assert_eq!(*trigger, dec!(90));
            }
            other => panic!("expected SetStopLoss, got {other:?}"),
        }
        assert_eq!(intents[1].kind, IntentKind::OpenSell);
        assert_eq!(intents[1].contract.strike, dec!(24000));
        match &intents[2].kind {
            IntentKind::OpenHedge { covers } => assert_eq!(*covers, leg),
            other => panic!("expected OpenHedge, got {other:?}"),
        }
        // Hedge strike: 24000 + 75 rounded to step 50 -> 24100
        assert_eq!(intents[2].contract.strike, dec!(24100));
        // One lot hedge
        assert_eq!(intents[2].quantity, dec!(50));

        // Sequences strictly increasing
        assert!(intents.windows(2).all(|w| w[0].sequence < w[1].sequence));
    }

    #[test]
    fn test_no_cascade_below_threshold() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        let leg = seed_sell(&mut ledger, dec!(24000), dec!(100));
        let symbol = ledger.leg(leg).unwrap().contract.symbol.clone();

        let quotes = quotes_with_spot(dec!(24013));
        mark(&quotes, &symbol, dec!(76)); // 24% decay

        let intents = engine.evaluate(&mut ledger, &quotes, now());
        assert!(intents.is_empty());
        assert_eq!(engine.state(), EngineState::Monitoring);
    }

    #[test]
    fn test_stop_loss_close_emitted_once() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        let leg = seed_sell(&mut ledger, dec!(24000), dec!(100));
        ledger.set_stop(leg, dec!(90), "SL-1".to_string()).unwrap();
        let symbol = ledger.leg(leg).unwrap().contract.symbol.clone();

        let quotes = quotes_with_spot(dec!(24013));
        mark(&quotes, &symbol, dec!(95)); // past the trigger

        let intents = engine.evaluate(&mut ledger, &quotes, now());
        assert_eq!(intents.len(), 1);
        assert!(matches!(
            intents[0].kind,
            IntentKind::CloseLeg {
                reason: CloseReason::StopLoss,
                ..
            }
        ));

        // STOPPED marker prevents re-emission next cycle
        engine.on_reconciled();
        let again = engine.evaluate(&mut ledger, &quotes, now());
        assert!(again.iter().all(|i| !matches!(
            i.kind,
            IntentKind::CloseLeg {
                reason: CloseReason::StopLoss,
                ..
            }
        )));
    }

    #[test]
    fn test_hedge_touch_replaced_with_far_month_double_qty() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        let sell = seed_sell(&mut ledger, dec!(23800), dec!(100));
        let hedge_contract = OptionContract::new("NIFTY", expiry(), dec!(24100), OptionKind::Call);
        let hedge = ledger
            .open_hedge(hedge_contract, dec!(50), dec!(40), sell, Uuid::new_v4(), now())
            .unwrap();

        // Spot right at the hedge strike
        let quotes = quotes_with_spot(dec!(24100));

        let intents = engine.evaluate(&mut ledger, &quotes, now());
        let close = intents
            .iter()
            .find(|i| {
                matches!(
                    i.kind,
                    IntentKind::CloseLeg {
                        reason: CloseReason::HedgeTouch,
                        ..
                    }
                )
            })
            .expect("hedge-touch close");
        match close.kind {
            IntentKind::CloseLeg { leg, .. } => assert_eq!(leg, hedge),
            _ => unreachable!(),
        }

        let replace = intents
            .iter()
            .find(|i| matches!(i.kind, IntentKind::OpenHedge { .. }))
            .expect("far-month replacement");
        // Double quantity at half the original premium
        assert_eq!(replace.quantity, dec!(100));
        assert_eq!(replace.limit_price, Some(dec!(20)));
        // Far month: third monthly from Sep 22 is Nov 27
        assert_eq!(
            replace.contract.expiry,
            NaiveDate::from_ymd_opt(2025, 11, 27).unwrap()
        );
        assert!(close.sequence < replace.sequence);
    }

    #[test]
    fn test_side_points_exit_closes_whole_side() {
        let mut engine = engine_with(StrategyConfig {
            profit_points: dec!(250),
            ..StrategyConfig::default()
        });
        let mut ledger = PositionLedger::new();
        let a = seed_sell(&mut ledger, dec!(24000), dec!(300));
        let b = seed_sell(&mut ledger, dec!(24100), dec!(200));
        let sym_a = ledger.leg(a).unwrap().contract.symbol.clone();
        let sym_b = ledger.leg(b).unwrap().contract.symbol.clone();

        let quotes = quotes_with_spot(dec!(24013));
        // 180 + 90 = 270 points on the call side
        mark(&quotes, &sym_a, dec!(120));
        mark(&quotes, &sym_b, dec!(110));

        let intents = engine.evaluate(&mut ledger, &quotes, now());
        let closes: Vec<_> = intents
            .iter()
            .filter(|i| {
                matches!(
                    i.kind,
                    IntentKind::CloseLeg {
                        reason: CloseReason::ProfitPoints,
                        ..
                    }
                )
            })
            .collect();
        assert_eq!(closes.len(), 2);
    }

    #[test]
    fn test_locked_engine_emits_nothing() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        let quotes = quotes_with_spot(dec!(24013));

        engine.lock();
        assert!(engine.evaluate(&mut ledger, &quotes, now()).is_empty());
        assert_eq!(engine.state(), EngineState::Locked);

        engine.unlock();
        assert!(!engine.evaluate(&mut ledger, &quotes, now()).is_empty());
    }

    #[test]
    fn test_outside_trading_window() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        let quotes = quotes_with_spot(dec!(24013));

        let sunday = Utc.with_ymd_and_hms(2025, 9, 21, 10, 0, 0).unwrap();
        assert!(engine.evaluate(&mut ledger, &quotes, sunday).is_empty());
    }

    #[test]
    fn test_sequences_increase_across_cycles() {
        let mut engine = engine();
        let mut ledger = PositionLedger::new();
        let quotes = quotes_with_spot(dec!(24013));

        let first = engine.evaluate(&mut ledger, &quotes, now());
        let last_seq = first.last().unwrap().sequence;

        // Simulate fills so the next cycle has active sells
        for intent in &first {
            ledger
                .open_sell(
                    intent.contract.clone(),
                    intent.quantity,
                    dec!(100),
                    intent.correlation_id,
                    now(),
                )
                .unwrap();
        }
        engine.on_reconciled();

        let symbol = first[0].contract.symbol.clone();
        mark(&quotes, &symbol, dec!(70));
        let second = engine.evaluate(&mut ledger, &quotes, now());
        assert!(!second.is_empty());
        assert!(second[0].sequence > last_seq);
    }
}
