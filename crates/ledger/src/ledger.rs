//! The position ledger

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use vega_core::{
    Leg, LegId, LegSide, LegStatus, OptionContract, OptionKind, Price, Quantity, Timestamp,
};

/// All legs, open and closed, plus aggregate PnL
///
/// Every mutation that stems from a fill takes the fill's correlation id
/// and is a no-op (error) when that id has been applied before, so a
/// replayed fill stream cannot double-book.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PositionLedger {
    legs: HashMap<LegId, Leg>,
    /// Correlation ids already applied
    applied: HashSet<Uuid>,
    realized_pnl: Decimal,
    /// Realized PnL booked on `realized_date`; resets at the day boundary
    realized_today: Decimal,
    realized_date: Option<NaiveDate>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a fill with this correlation id has already been applied
    pub fn is_applied(&self, correlation_id: Uuid) -> bool {
        self.applied.contains(&correlation_id)
    }

    fn claim(&mut self, correlation_id: Uuid) -> Result<()> {
        if !self.applied.insert(correlation_id) {
            return Err(LedgerError::DuplicateFill(correlation_id));
        }
        Ok(())
    }

    /// Open a SELL leg from an entry fill
    pub fn open_sell(
        &mut self,
        contract: OptionContract,
        quantity: Quantity,
        entry_premium: Price,
        correlation_id: Uuid,
        at: Timestamp,
    ) -> Result<LegId> {
        self.claim(correlation_id)?;
        let leg = Leg::new_sell(contract, quantity, entry_premium, at);
        let id = leg.id;
        self.legs.insert(id, leg);
        Ok(id)
    }

    /// Open a HEDGE_BUY leg protecting an active SELL leg
    pub fn open_hedge(
        &mut self,
        contract: OptionContract,
        quantity: Quantity,
        entry_premium: Price,
        covers: LegId,
        correlation_id: Uuid,
        at: Timestamp,
    ) -> Result<LegId> {
        match self.legs.get(&covers) {
            None => return Err(LedgerError::UnknownLeg(covers)),
            Some(sell) if !sell.is_active() || sell.side != LegSide::Sell => {
                return Err(LedgerError::CoveredSellNotActive(covers));
            }
            Some(_) => {}
        }
        self.claim(correlation_id)?;

        let hedge = Leg::new_hedge(contract, quantity, entry_premium, covers, at);
        let id = hedge.id;
        self.legs.insert(id, hedge);
        if let Some(sell) = self.legs.get_mut(&covers) {
            sell.hedged_by = Some(id);
        }
        Ok(id)
    }

    /// Record a stop-loss trigger on a leg along with the broker order id
    /// of the resting stop order
    pub fn set_stop(&mut self, leg_id: LegId, trigger: Price, order_id: String) -> Result<()> {
        let leg = self
            .legs
            .get_mut(&leg_id)
            .ok_or(LedgerError::UnknownLeg(leg_id))?;
        if !leg.is_active() {
            return Err(LedgerError::LegNotActive(leg_id));
        }
        leg.stop_trigger = Some(trigger);
        leg.stop_order_id = Some(order_id);
        Ok(())
    }

    /// Take the resting stop order id off a leg, if one is recorded
    ///
    /// The trigger itself stays: the engine's own breach check still
    /// applies after the broker-side order is gone.
    pub fn clear_stop_order(&mut self, leg_id: LegId) -> Option<String> {
        self.legs.get_mut(&leg_id)?.stop_order_id.take()
    }

    /// Close a leg at the given exit premium, returning realized PnL
    pub fn close_leg(
        &mut self,
        leg_id: LegId,
        exit_premium: Price,
        correlation_id: Uuid,
        at: Timestamp,
    ) -> Result<Decimal> {
        if !self.legs.contains_key(&leg_id) {
            return Err(LedgerError::UnknownLeg(leg_id));
        }
        self.claim(correlation_id)?;

        let (realized, unlink) = {
            let leg = match self.legs.get_mut(&leg_id) {
                Some(l) => l,
                None => return Err(LedgerError::UnknownLeg(leg_id)),
            };
            leg.mark(exit_premium);
            let realized = leg.unrealized_pnl();
            leg.close(at);
            (realized, leg.covers)
        };

        // A closed hedge must be forgotten by the sell it covered
        if let Some(sell_id) = unlink {
            if let Some(sell) = self.legs.get_mut(&sell_id) {
                if sell.hedged_by == Some(leg_id) {
                    sell.hedged_by = None;
                }
            }
        }

        self.realized_pnl += realized;
        self.book_daily(realized, at.date_naive());
        Ok(realized)
    }

    fn book_daily(&mut self, realized: Decimal, day: NaiveDate) {
        if self.realized_date != Some(day) {
            self.realized_date = Some(day);
            self.realized_today = Decimal::ZERO;
        }
        self.realized_today += realized;
    }

    /// Merge active hedges holding the same contract into one leg
    ///
    /// The earliest hedge survives with the summed quantity and a
    /// quantity-weighted entry premium; absorbed hedges are closed with
    /// no realized impact and their covered sells re-point to the
    /// survivor. Returns the survivor when a merge happened.
    pub fn consolidate_hedges(&mut self, symbol: &str, at: Timestamp) -> Option<LegId> {
        let mut hedges: Vec<(LegId, Timestamp)> = self
            .active_hedges()
            .filter(|l| l.contract.symbol == symbol)
            .map(|l| (l.id, l.opened_at))
            .collect();
        if hedges.len() < 2 {
            return None;
        }
        hedges.sort_by_key(|&(id, opened_at)| (opened_at, id));
        let survivor = hedges[0].0;

        let mut total_quantity = Decimal::ZERO;
        let mut total_cost = Decimal::ZERO;
        for (id, _) in &hedges {
            if let Some(leg) = self.legs.get(id) {
                total_quantity += leg.quantity;
                total_cost += leg.entry_premium * leg.quantity;
            }
        }

        for (id, _) in hedges.iter().skip(1) {
            let covers = match self.legs.get_mut(id) {
                Some(absorbed) => {
                    absorbed.close(at);
                    absorbed.covers
                }
                None => None,
            };
            if let Some(sell_id) = covers {
                if let Some(sell) = self.legs.get_mut(&sell_id) {
                    if sell.hedged_by == Some(*id) {
                        sell.hedged_by = Some(survivor);
                    }
                }
            }
        }

        if let Some(leg) = self.legs.get_mut(&survivor) {
            leg.quantity = total_quantity;
            if !total_quantity.is_zero() {
                leg.entry_premium = total_cost / total_quantity;
            }
        }
        Some(survivor)
    }

    /// Mark all active legs on the given symbol with a fresh premium
    pub fn mark(&mut self, symbol: &str, premium: Price) {
        for leg in self.legs.values_mut() {
            if leg.is_active() && leg.contract.symbol == symbol {
                leg.mark(premium);
            }
        }
    }

    /// Record that a rollover has been executed for this leg
    pub fn mark_rolled(&mut self, leg_id: LegId) -> Result<()> {
        let leg = self
            .legs
            .get_mut(&leg_id)
            .ok_or(LedgerError::UnknownLeg(leg_id))?;
        leg.rolled = true;
        Ok(())
    }

    /// Move a STOPPED or OPEN leg to STOPPED once its trigger is hit
    pub fn mark_stopped(&mut self, leg_id: LegId) -> Result<()> {
        let leg = self
            .legs
            .get_mut(&leg_id)
            .ok_or(LedgerError::UnknownLeg(leg_id))?;
        if !leg.is_active() {
            return Err(LedgerError::LegNotActive(leg_id));
        }
        leg.status = LegStatus::Stopped;
        Ok(())
    }

    pub fn leg(&self, leg_id: LegId) -> Option<&Leg> {
        self.legs.get(&leg_id)
    }

    /// All legs still holding exposure
    pub fn active_legs(&self) -> impl Iterator<Item = &Leg> {
        self.legs.values().filter(|l| l.is_active())
    }

    pub fn active_sells(&self) -> impl Iterator<Item = &Leg> {
        self.active_legs().filter(|l| l.side == LegSide::Sell)
    }

    pub fn active_hedges(&self) -> impl Iterator<Item = &Leg> {
        self.active_legs().filter(|l| l.side == LegSide::HedgeBuy)
    }

    /// Active hedges whose covered SELL leg is gone or no longer active
    pub fn orphan_hedges(&self) -> Vec<&Leg> {
        self.active_hedges()
            .filter(|hedge| {
                hedge
                    .covers
                    .and_then(|sell_id| self.legs.get(&sell_id))
                    .map(|sell| !sell.is_active())
                    .unwrap_or(true)
            })
            .collect()
    }

    /// True if an active leg of the given side already sits at this
    /// strike and kind
    pub fn has_active_at(&self, strike: Price, kind: OptionKind, side: LegSide) -> bool {
        self.active_legs().any(|l| {
            l.side == side && l.contract.kind == kind && l.contract.strike == strike
        })
    }

    /// Strikes of all active legs of the given kind
    pub fn active_strikes(&self, kind: OptionKind) -> Vec<Price> {
        self.active_legs()
            .filter(|l| l.contract.kind == kind)
            .map(|l| l.contract.strike)
            .collect()
    }

    /// Net profit points across active legs of one option kind (CE or PE)
    pub fn side_points(&self, kind: OptionKind) -> Decimal {
        self.active_legs()
            .filter(|l| l.contract.kind == kind)
            .map(|l| l.profit_points())
            .sum()
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        self.active_legs().map(|l| l.unrealized_pnl()).sum()
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Realized PnL booked on `today`; zero on any other day
    pub fn realized_pnl_today(&self, today: NaiveDate) -> Decimal {
        if self.realized_date == Some(today) {
            self.realized_today
        } else {
            Decimal::ZERO
        }
    }

    pub fn total_pnl(&self) -> Decimal {
        self.realized_pnl + self.unrealized_pnl()
    }

    /// Today's realized plus current unrealized, for the daily loss limit
    pub fn daily_pnl(&self, today: NaiveDate) -> Decimal {
        self.realized_pnl_today(today) + self.unrealized_pnl()
    }

    /// Largest single-strike share of total active notional, 0 when flat
    pub fn max_strike_concentration(&self) -> Decimal {
        let mut by_strike: HashMap<Price, Decimal> = HashMap::new();
        let mut total = Decimal::ZERO;
        for leg in self.active_legs() {
            let notional = leg.current_premium * leg.quantity;
            *by_strike.entry(leg.contract.strike).or_default() += notional;
            total += notional;
        }
        if total.is_zero() {
            return Decimal::ZERO;
        }
        by_strike
            .into_values()
            .max()
            .map(|m| m / total)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn active_count(&self) -> usize {
        self.active_legs().count()
    }

    /// Serialize the full ledger state to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reload a ledger from a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
