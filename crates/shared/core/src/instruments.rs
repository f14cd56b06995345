//! Option instruments for a single index chain
//!
//! One underlying (e.g. NIFTY), weekly and monthly expiries, strikes on a
//! fixed step. Symbols follow the exchange convention
//! `{UNDERLYING}{DDMMMYY}{STRIKE}{CE|PE}`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::values::{Price, Quantity, Symbol};

/// Option kind: Call (CE) or Put (PE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Exchange suffix for the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CE",
            Self::Put => "PE",
        }
    }

    /// The opposite kind (CE <-> PE)
    pub fn opposite(&self) -> Self {
        match self {
            Self::Call => Self::Put,
            Self::Put => Self::Call,
        }
    }

    /// Direction away from spot for this kind: +1 for calls, -1 for puts
    pub fn away_from_spot(&self) -> Decimal {
        match self {
            Self::Call => Decimal::ONE,
            Self::Put => Decimal::NEGATIVE_ONE,
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Round a price to the nearest valid strike on the given step
pub fn nearest_strike(price: Price, step: Price) -> Price {
    if step.is_zero() {
        return price;
    }
    (price / step).round() * step
}

/// An option contract within the single instrument family this system trades
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionContract {
    /// Underlying index name (e.g. "NIFTY")
    pub underlying: String,
    /// Expiry date of the contract
    pub expiry: NaiveDate,
    /// Strike price
    pub strike: Price,
    /// Call or put
    pub kind: OptionKind,
    /// Exchange trading symbol
    pub symbol: Symbol,
    /// Minimum premium increment
    pub tick_size: Price,
    /// Quantity per lot
    pub lot_size: Quantity,
    /// Strike interval for the chain
    pub strike_step: Price,
}

impl OptionContract {
    /// Create a new contract with NIFTY-style defaults
    pub fn new(
        underlying: impl Into<String>,
        expiry: NaiveDate,
        strike: Price,
        kind: OptionKind,
    ) -> Self {
        let underlying = underlying.into();
        let symbol = format!(
            "{}{}{}{}",
            underlying,
            expiry.format("%d%b%y").to_string().to_uppercase(),
            strike.normalize(),
            kind
        );

        Self {
            underlying,
            expiry,
            strike,
            kind,
            symbol,
            tick_size: dec!(0.05),
            lot_size: dec!(50),
            strike_step: dec!(50),
        }
    }

    /// Same contract at a different strike (re-derives the symbol)
    pub fn at_strike(&self, strike: Price) -> Self {
        let mut contract = Self::new(self.underlying.clone(), self.expiry, strike, self.kind);
        contract.tick_size = self.tick_size;
        contract.lot_size = self.lot_size;
        contract.strike_step = self.strike_step;
        contract
    }

    /// Same contract at a different expiry (re-derives the symbol)
    pub fn at_expiry(&self, expiry: NaiveDate) -> Self {
        let mut contract = Self::new(self.underlying.clone(), expiry, self.strike, self.kind);
        contract.tick_size = self.tick_size;
        contract.lot_size = self.lot_size;
        contract.strike_step = self.strike_step;
        contract
    }

    pub fn with_lot_size(mut self, lot: Quantity) -> Self {
        self.lot_size = lot;
        self
    }

    pub fn with_strike_step(mut self, step: Price) -> Self {
        self.strike_step = step;
        self
    }

    /// Days remaining until expiry (negative after expiry)
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry - today).num_days()
    }

    /// Check if the contract has expired
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.expiry
    }

    /// Calculate intrinsic value at a given spot
    pub fn intrinsic_value(&self, spot: Price) -> Decimal {
        match self.kind {
            OptionKind::Call => (spot - self.strike).max(Decimal::ZERO),
            OptionKind::Put => (self.strike - spot).max(Decimal::ZERO),
        }
    }

    /// Check if spot is within one tick of the strike
    pub fn strike_touched(&self, spot: Price) -> bool {
        (spot - self.strike).abs() <= self.tick_size
    }
}

impl std::fmt::Display for OptionContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 25).unwrap()
    }

    #[test]
    fn test_symbol_format() {
        let contract = OptionContract::new("NIFTY", expiry(), dec!(24000), OptionKind::Call);
        assert_eq!(contract.symbol, "NIFTY25SEP2524000CE");

        let put = OptionContract::new("NIFTY", expiry(), dec!(23500), OptionKind::Put);
        assert!(put.symbol.ends_with("PE"));
    }

    #[test]
    fn test_nearest_strike() {
        assert_eq!(nearest_strike(dec!(24023), dec!(50)), dec!(24000));
        assert_eq!(nearest_strike(dec!(24026), dec!(50)), dec!(24050));
        assert_eq!(nearest_strike(dec!(24180), dec!(100)), dec!(24200));
    }

    #[test]
    fn test_intrinsic_value() {
        let call = OptionContract::new("NIFTY", expiry(), dec!(24000), OptionKind::Call);
        assert_eq!(call.intrinsic_value(dec!(24500)), dec!(500));
        assert_eq!(call.intrinsic_value(dec!(23500)), dec!(0));

        let put = OptionContract::new("NIFTY", expiry(), dec!(24000), OptionKind::Put);
        assert_eq!(put.intrinsic_value(dec!(23500)), dec!(500));
        assert_eq!(put.intrinsic_value(dec!(24500)), dec!(0));
    }

    #[test]
    fn test_strike_touched() {
        let call = OptionContract::new("NIFTY", expiry(), dec!(24000), OptionKind::Call);
        assert!(call.strike_touched(dec!(24000)));
        assert!(call.strike_touched(dec!(24000.05)));
        assert!(!call.strike_touched(dec!(24001)));
    }

    #[test]
    fn test_days_to_expiry() {
        let contract = OptionContract::new("NIFTY", expiry(), dec!(24000), OptionKind::Call);
        let today = NaiveDate::from_ymd_opt(2025, 9, 23).unwrap();
        assert_eq!(contract.days_to_expiry(today), 2);
        assert!(!contract.is_expired(expiry()));
        assert!(contract.is_expired(expiry().succ_opt().unwrap()));
    }

    #[test]
    fn test_at_strike_rederives_symbol() {
        let call = OptionContract::new("NIFTY", expiry(), dec!(24000), OptionKind::Call)
            .with_lot_size(dec!(75));
        let shifted = call.at_strike(dec!(24100));
        assert_eq!(shifted.strike, dec!(24100));
        assert!(shifted.symbol.contains("24100"));
        assert_eq!(shifted.lot_size, dec!(75));
    }
}
