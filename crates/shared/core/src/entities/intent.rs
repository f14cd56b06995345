//! Order intents - what the decision engine asks the order manager to do
//!
//! An intent is immutable once emitted. The correlation id ties every
//! broker attempt (including retries) back to one logical order; the
//! sequence number is strictly increasing per engine run so a replayed
//! intent stream can be deduplicated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::leg::{LegId, LegSide};
use crate::instruments::OptionContract;
use crate::values::{Price, Quantity, Timestamp};

/// Why a leg is being closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    /// Side-level profit points target reached
    ProfitPoints,
    /// Stop-loss triggered
    StopLoss,
    /// Spot touched the hedge strike
    HedgeTouch,
    /// Hedge lost its referencing sell leg
    OrphanHedge,
    /// Replaced on expiry day
    ExpiryReplace,
    /// Rolled to a later expiry
    Rollover,
    /// Risk manager forced liquidation
    ForceLiquidate,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ProfitPoints => "profit_points",
            Self::StopLoss => "stop_loss",
            Self::HedgeTouch => "hedge_touch",
            Self::OrphanHedge => "orphan_hedge",
            Self::ExpiryReplace => "expiry_replace",
            Self::Rollover => "rollover",
            Self::ForceLiquidate => "force_liquidate",
        };
        write!(f, "{s}")
    }
}

/// The action an intent requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentKind {
    /// Open a new SELL leg
    OpenSell,
    /// Open a HEDGE_BUY leg protecting the given SELL leg
    OpenHedge { covers: LegId },
    /// Set or adjust the stop-loss trigger on a leg
    SetStopLoss { leg: LegId, trigger: Price },
    /// Close a leg at market
    CloseLeg { leg: LegId, reason: CloseReason },
    /// Close the leg and reopen it at a later expiry
    Rollover { leg: LegId, to_expiry: NaiveDate },
}

impl IntentKind {
    /// The leg side the resulting position (if any) will carry
    pub fn opens_side(&self) -> Option<LegSide> {
        match self {
            Self::OpenSell => Some(LegSide::Sell),
            Self::OpenHedge { .. } => Some(LegSide::HedgeBuy),
            _ => None,
        }
    }
}

/// A requested order action, immutable once emitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Ties all broker attempts for this intent together
    pub correlation_id: Uuid,
    /// Strictly increasing per engine run
    pub sequence: u64,
    pub kind: IntentKind,
    /// Contract the order targets
    pub contract: OptionContract,
    pub quantity: Quantity,
    /// Limit price; None means market
    pub limit_price: Option<Price>,
    pub created_at: Timestamp,
}

impl OrderIntent {
    pub fn new(
        sequence: u64,
        kind: IntentKind,
        contract: OptionContract,
        quantity: Quantity,
        created_at: Timestamp,
    ) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            sequence,
            kind,
            contract,
            quantity,
            limit_price: None,
            created_at,
        }
    }

    pub fn with_limit(mut self, price: Price) -> Self {
        self.limit_price = Some(price);
        self
    }

    /// True if this intent only adjusts an existing order (no new exposure)
    pub fn is_adjustment(&self) -> bool {
        matches!(self.kind, IntentKind::SetStopLoss { .. })
    }

    /// True if executing this intent reduces exposure
    pub fn is_closing(&self) -> bool {
        matches!(
            self.kind,
            IntentKind::CloseLeg { .. } | IntentKind::Rollover { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::OptionKind;
    use chrono::Utc;
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
    fn test_intent_classification() {
        let open = OrderIntent::new(1, IntentKind::OpenSell, contract(), dec!(50), Utc::now());
        assert!(!open.is_closing());
        assert_eq!(open.kind.opens_side(), Some(LegSide::Sell));

        let leg = Uuid::new_v4();
        let close = OrderIntent::new(
            2,
            IntentKind::CloseLeg {
                leg,
                reason: CloseReason::StopLoss,
            },
            contract(),
            dec!(50),
            Utc::now(),
        );
        assert!(close.is_closing());
        assert!(close.kind.opens_side().is_none());

        let sl = OrderIntent::new(
            3,
            IntentKind::SetStopLoss {
                leg,
                trigger: dec!(90),
            },
            contract(),
            dec!(50),
            Utc::now(),
        );
        assert!(sl.is_adjustment());
    }

    #[test]
    fn test_correlation_ids_unique() {
        let a = OrderIntent::new(1, IntentKind::OpenSell, contract(), dec!(50), Utc::now());
        let b = OrderIntent::new(2, IntentKind::OpenSell, contract(), dec!(50), Utc::now());
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
