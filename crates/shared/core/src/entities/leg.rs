//! Leg - one option contract position within a multi-leg strategy
//!
//! Legs come in two sides: SELL (the premium-collecting short) and
//! HEDGE_BUY (the protective long bought against a SELL leg). Every
//! HEDGE_BUY leg references the SELL leg it protects; a SELL leg holds a
//! back-reference to its active hedge. The ledger enforces that a hedge
//! never outlives its referencing sell.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::instruments::OptionContract;
use crate::values::{Price, Quantity, Timestamp};

/// Unique identifier for a leg
pub type LegId = Uuid;

/// Side of a leg within the strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegSide {
    /// Short option collecting premium
    Sell,
    /// Protective long bought against a sell leg
    HedgeBuy,
}

impl LegSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sell => "sell",
            Self::HedgeBuy => "hedge_buy",
        }
    }
}

/// Lifecycle status of a leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegStatus {
    /// Position is live
    Open,
    /// Stop-loss triggered, awaiting exit fill
    Stopped,
    /// Fully exited
    Closed,
}

/// One option contract position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leg {
    pub id: LegId,
    pub contract: OptionContract,
    pub side: LegSide,
    /// Total quantity (lots x lot size)
    pub quantity: Quantity,
    /// Premium at entry fill
    pub entry_premium: Price,
    /// Latest marked premium (updated on every tick)
    pub current_premium: Price,
    /// Active stop-loss trigger, if one has been set
    pub stop_trigger: Option<Price>,
    /// Broker order id of the resting stop-loss order, while one rests
    pub stop_order_id: Option<String>,
    pub status: LegStatus,
    /// For HEDGE_BUY legs: the SELL leg this hedge protects
    pub covers: Option<LegId>,
    /// For SELL legs: the active HEDGE_BUY leg, if any
    pub hedged_by: Option<LegId>,
    /// Set once a rollover has been executed for this expiry cycle
    pub rolled: bool,
    pub opened_at: Timestamp,
    pub closed_at: Option<Timestamp>,
}

impl Leg {
    /// Create a new SELL leg from an entry fill
    pub fn new_sell(
        contract: OptionContract,
        quantity: Quantity,
        entry_premium: Price,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract,
            side: LegSide::Sell,
            quantity,
            entry_premium,
            current_premium: entry_premium,
            stop_trigger: None,
            stop_order_id: None,
            status: LegStatus::Open,
            covers: None,
            hedged_by: None,
            rolled: false,
            opened_at,
            closed_at: None,
        }
    }

    /// Create a new HEDGE_BUY leg protecting the given SELL leg
    pub fn new_hedge(
        contract: OptionContract,
        quantity: Quantity,
        entry_premium: Price,
        covers: LegId,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract,
            side: LegSide::HedgeBuy,
            quantity,
            entry_premium,
            current_premium: entry_premium,
            stop_trigger: None,
            stop_order_id: None,
            status: LegStatus::Open,
            covers: Some(covers),
            hedged_by: None,
            rolled: false,
            opened_at,
            closed_at: None,
        }
    }

    /// Leg still holds market exposure (OPEN or STOPPED, not yet exited)
    pub fn is_active(&self) -> bool {
        matches!(self.status, LegStatus::Open | LegStatus::Stopped)
    }

    /// Unrealized PnL at the current marked premium
    ///
    /// A SELL leg profits as premium decays; a HEDGE_BUY leg profits as
    /// premium rises.
    pub fn unrealized_pnl(&self) -> Decimal {
        match self.side {
            LegSide::Sell => (self.entry_premium - self.current_premium) * self.quantity,
            LegSide::HedgeBuy => (self.current_premium - self.entry_premium) * self.quantity,
        }
    }

    /// Premium decay as a fraction of entry premium (positive = profitable
    /// for a SELL leg)
    pub fn decay_fraction(&self) -> Decimal {
        if self.entry_premium.is_zero() {
            return Decimal::ZERO;
        }
        (self.entry_premium - self.current_premium) / self.entry_premium
    }

    /// Profit in index points per unit for this leg
    pub fn profit_points(&self) -> Decimal {
        match self.side {
            LegSide::Sell => self.entry_premium - self.current_premium,
            LegSide::HedgeBuy => self.current_premium - self.entry_premium,
        }
    }

    /// Mark the leg with a fresh premium
    pub fn mark(&mut self, premium: Price) {
        self.current_premium = premium;
    }

    /// Transition to CLOSED at the given exit time
    pub fn close(&mut self, closed_at: DateTime<Utc>) {
        self.status = LegStatus::Closed;
        self.closed_at = Some(closed_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::OptionKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn contract() -> OptionContract {
        OptionContract::new(
            "NIFTY",
            NaiveDate::from_ymd_opt(2025, 9, 25).unwrap(),
            dec!(24000),
            OptionKind::Call,
        )
    }

    #[test]
    fn test_sell_leg_pnl() {
        let mut leg = Leg::new_sell(contract(), dec!(50), dec!(100), Utc::now());
        assert_eq!(leg.unrealized_pnl(), dec!(0));

        leg.mark(dec!(75));
        assert_eq!(leg.unrealized_pnl(), dec!(1250)); // (100 - 75) * 50
        assert_eq!(leg.decay_fraction(), dec!(0.25));
        assert_eq!(leg.profit_points(), dec!(25));
    }

    #[test]
    fn test_hedge_leg_pnl() {
        let sell = Leg::new_sell(contract(), dec!(50), dec!(100), Utc::now());
        let mut hedge = Leg::new_hedge(contract(), dec!(50), dec!(40), sell.id, Utc::now());
        assert_eq!(hedge.covers, Some(sell.id));

        hedge.mark(dec!(30));
        assert_eq!(hedge.unrealized_pnl(), dec!(-500)); // (30 - 40) * 50
        assert_eq!(hedge.decay_fraction(), dec!(0.25)); // 25% of entry lost
    }

    #[test]
    fn test_close_transitions_status() {
        let mut leg = Leg::new_sell(contract(), dec!(50), dec!(100), Utc::now());
        assert!(leg.is_active());

        leg.status = LegStatus::Stopped;
        assert!(leg.is_active());

        leg.close(Utc::now());
        assert!(!leg.is_active());
        assert!(leg.closed_at.is_some());
    }

    #[test]
    fn test_zero_entry_premium_decay() {
        let leg = Leg::new_sell(contract(), dec!(50), dec!(0), Utc::now());
        assert_eq!(leg.decay_fraction(), dec!(0));
    }
}
