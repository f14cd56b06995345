//! Strategy configuration and trading calendar
//!
//! `StrategyConfig` is loaded once at startup and never mutated during a
//! run. Components receive it behind an `Arc` and read from it freely.

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::values::{Price, Quantity, Timestamp};

/// Which multi-leg structure the engine trades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyMode {
    /// Sell call + put at the ATM strike
    Straddle,
    /// Sell call + put at spot +/- strangle_distance
    Strangle,
    /// Straddle with protective wings bought at entry
    IronFly,
}

impl StrategyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Straddle => "straddle",
            Self::Strangle => "strangle",
            Self::IronFly => "iron_fly",
        }
    }
}

/// Exchange trading calendar: sessions and holidays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingCalendar {
    /// Weekdays on which the exchange is open
    pub trading_days: Vec<Weekday>,
    pub open: NaiveTime,
    pub close: NaiveTime,
    /// Exchange holidays falling on otherwise-trading weekdays
    pub holidays: Vec<NaiveDate>,
}

impl Default for TradingCalendar {
    fn default() -> Self {
        Self {
            trading_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            // NSE cash session in IST, held here as naive wall-clock times
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
            holidays: Vec::new(),
        }
    }
}

impl TradingCalendar {
    /// True if the exchange trades on this date
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.trading_days.contains(&date.weekday()) && !self.holidays.contains(&date)
    }

    /// True if the given instant falls inside a trading session
    ///
    /// `open`/`close` are exchange-local wall-clock times and `at` is
    /// read as exchange-local too; no timezone conversion is applied.
    /// Deployments feeding UTC timestamps must configure session bounds
    /// in UTC (09:15 IST = 03:45 UTC).
    pub fn is_open(&self, at: Timestamp) -> bool {
        let local = at.naive_utc();
        if !self.is_trading_day(local.date()) {
            return false;
        }
        let t = local.time();
        t >= self.open && t < self.close
    }
}

/// Immutable per-run strategy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Index underlying, e.g. "NIFTY"
    pub underlying: String,
    pub mode: StrategyMode,
    /// Strike offset applied to the ATM strike for straddle entries
    pub bias: Decimal,
    /// Distance from spot for strangle strikes
    pub strangle_distance: Decimal,
    /// Exchange strike step for the underlying
    pub strike_step: Decimal,
    /// Contract lot size
    pub lot_size: Quantity,
    /// Lots per new SELL leg
    pub lots_per_leg: u32,

    // Trigger thresholds
    /// Premium decay percent that triggers the profit cascade
    pub profit_percentage: Decimal,
    /// Stop-loss trigger as a percent of entry premium
    pub stop_loss_percentage: Decimal,
    /// Side-level (CE/PE) profit points that close the whole side
    pub profit_points: Decimal,
    /// Minimum strike distance from existing legs for adjacency sells
    pub adjacency_gap: Decimal,

    // Hedging policy
    pub buy_hedge: bool,
    /// Hedge quantity is one lot regardless of the covered sell size
    pub hedge_one_lot: bool,
    /// Add a far-month sell alongside weekly entries
    pub far_sell_add: bool,

    // Risk limits
    pub capital_allocated: Decimal,
    /// Unrealized loss percent of capital that forces liquidation
    pub shutdown_loss: Decimal,
    /// Daily realized+unrealized loss limit (absolute)
    pub daily_loss_limit: Decimal,
    /// Volatility index level that forces liquidation
    pub vix_threshold: Decimal,
    /// Percent of margin kept free; utilization above (100 - buffer) vetoes
    pub margin_buffer_pct: Decimal,
    /// Maximum fraction of exposure allowed at a single strike
    pub concentration_limit: Decimal,

    // Order handling
    pub max_order_retries: u32,
    /// Backoff base in seconds, doubled per retry
    pub retry_backoff_secs: u64,
    /// Minimum spacing between broker calls, in milliseconds
    pub rate_limit_ms: u64,
    /// Consecutive failures that trip the circuit breaker
    pub max_consecutive_failures: u32,
    /// Breaker cool-down before half-open probing, in seconds
    pub breaker_cooldown_secs: u64,
    /// Deadline for a submitted order to reach a terminal state
    pub submit_timeout_secs: u64,
    /// Band around LTP for the market-to-limit fallback, as a fraction
    pub limit_fallback_band: Decimal,

    // Expiry handling
    /// Days to expiry at or below which positions roll
    pub rollover_days_threshold: i64,
    /// Index into the monthly expiry list used as "far month"
    pub far_month_index: usize,

    // Feed
    pub max_reconnect_attempts: u32,
    /// Quotes older than this are treated as stale, in seconds
    pub quote_staleness_secs: i64,

    // Scheduling
    pub evaluate_interval_ms: u64,
    pub snapshot_interval_secs: u64,

    pub calendar: TradingCalendar,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            underlying: "NIFTY".to_string(),
            mode: StrategyMode::Straddle,
            bias: dec!(0),
            strangle_distance: dec!(1000),
            strike_step: dec!(50),
            lot_size: dec!(50),
            lots_per_leg: 1,

            profit_percentage: dec!(25),  // decay % triggering the cascade
            stop_loss_percentage: dec!(90), // SL at 90% of entry premium
            profit_points: dec!(250),     // per side (CE / PE)
            adjacency_gap: dec!(100),

            buy_hedge: true,
            hedge_one_lot: true,
            far_sell_add: false,

            capital_allocated: dec!(1000000),
            shutdown_loss: dec!(12.5), // percent of capital
            daily_loss_limit: dec!(50000),
            vix_threshold: dec!(30),
            margin_buffer_pct: dec!(20),
            concentration_limit: dec!(0.5),

            max_order_retries: 3,
            retry_backoff_secs: 1,
            rate_limit_ms: 1000,
            max_consecutive_failures: 5,
            breaker_cooldown_secs: 300,
            submit_timeout_secs: 30,
            limit_fallback_band: dec!(0.01), // 1% around LTP

            rollover_days_threshold: 2,
            far_month_index: 2, // third monthly expiry

            max_reconnect_attempts: 3,
            quote_staleness_secs: 10,

            evaluate_interval_ms: 1000,
            snapshot_interval_secs: 60,

            calendar: TradingCalendar::default(),
        }
    }
}

impl StrategyConfig {
    /// Quantity for a new SELL leg
    pub fn sell_quantity(&self) -> Quantity {
        self.lot_size * Decimal::from(self.lots_per_leg)
    }

    /// Quantity for a hedge protecting a sell of the given size
    pub fn hedge_quantity(&self, sell_quantity: Quantity) -> Quantity {
        if self.hedge_one_lot {
            self.lot_size
        } else {
            sell_quantity
        }
    }

    /// Stop-loss trigger premium for the given entry premium
    pub fn stop_trigger(&self, entry_premium: Price) -> Price {
        entry_premium * self.stop_loss_percentage / dec!(100)
    }

    /// Maximum margin utilization fraction before intents are vetoed
    pub fn max_utilization(&self) -> Decimal {
        (dec!(100) - self.margin_buffer_pct) / dec!(100)
    }

    /// Shutdown loss threshold in absolute currency terms
    pub fn shutdown_loss_amount(&self) -> Decimal {
        self.capital_allocated * self.shutdown_loss / dec!(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_default_thresholds() {
        let cfg = StrategyConfig::default();
        assert_eq!(cfg.stop_trigger(dec!(100)), dec!(90));
        assert_eq!(cfg.shutdown_loss_amount(), dec!(125000));
        assert_eq!(cfg.max_utilization(), dec!(0.8));
        assert_eq!(cfg.sell_quantity(), dec!(50));
    }

    #[test]
    fn test_hedge_quantity_policy() {
        let mut cfg = StrategyConfig::default();
        assert_eq!(cfg.hedge_quantity(dec!(150)), dec!(50)); // one lot

        cfg.hedge_one_lot = false;
        assert_eq!(cfg.hedge_quantity(dec!(150)), dec!(150));
    }

    #[test]
    fn test_calendar_weekend_and_holiday() {
        let mut cal = TradingCalendar::default();
        let sat = NaiveDate::from_ymd_opt(2025, 9, 27).unwrap();
        let thu = NaiveDate::from_ymd_opt(2025, 9, 25).unwrap();
        assert!(!cal.is_trading_day(sat));
        assert!(cal.is_trading_day(thu));

        cal.holidays.push(thu);
        assert!(!cal.is_trading_day(thu));
    }

    #[test]
    fn test_calendar_session_bounds() {
        let cal = TradingCalendar::default();
        let during = Utc.with_ymd_and_hms(2025, 9, 25, 10, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 9, 25, 8, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 9, 25, 16, 0, 0).unwrap();
        assert!(cal.is_open(during));
        assert!(!cal.is_open(before));
        assert!(!cal.is_open(after));
    }
}
