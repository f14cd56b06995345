//! Verdict and market-state types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vega_feed::FeedHealth;
use vega_core::Price;

/// Why the whole book is being liquidated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidateReason {
    /// Volatility index at or above the configured threshold
    Volatility,
    /// Unrealized loss past the shutdown percentage of capital
    PortfolioLoss,
    /// Realized plus unrealized loss past the daily limit
    DailyLoss,
}

impl std::fmt::Display for LiquidateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Volatility => "volatility",
            Self::PortfolioLoss => "portfolio-loss",
            Self::DailyLoss => "daily-loss",
        };
        write!(f, "{s}")
    }
}

/// Why a single intent was suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VetoReason {
    /// Projected margin utilization past the buffer
    Margin,
    /// Single-strike exposure past the concentration limit
    Concentration,
}

impl std::fmt::Display for VetoReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Margin => "margin",
            Self::Concentration => "concentration",
        };
        write!(f, "{s}")
    }
}

/// One suppressed intent
#[derive(Debug, Clone)]
pub struct Veto {
    pub correlation_id: Uuid,
    pub reason: VetoReason,
}

/// Global verdict for a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskVerdict {
    /// Proceed; intents still pass the per-intent screen
    Ok,
    /// Skip this cycle entirely, keep positions
    Pause,
    /// Close everything at market, supersedes all other intents
    ForceLiquidate(LiquidateReason),
}

/// Market inputs the monitor needs beyond the ledger
#[derive(Debug, Clone)]
pub struct MarketState {
    /// Latest volatility index value, if known
    pub vix: Option<Decimal>,
    /// Latest underlying spot, if known
    pub spot: Option<Price>,
    pub feed: FeedHealth,
    /// Margin currently in use at the broker
    pub margin_used: Option<Decimal>,
    /// Margin still available at the broker
    pub margin_available: Option<Decimal>,
}

impl MarketState {
    /// Current margin utilization as a fraction, when both figures are known
    pub fn margin_utilization(&self) -> Option<Decimal> {
        let used = self.margin_used?;
        let available = self.margin_available?;
        let total = used + available;
        if total.is_zero() {
            return None;
        }
        Some(used / total)
    }
}
