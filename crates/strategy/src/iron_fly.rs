//! Iron fly: ATM straddle with protective wings bought at entry

use rust_decimal_macros::dec;

use crate::variant::StrategyVariant;
use vega_core::{OptionKind, Price, StrategyConfig, nearest_strike};

/// ATM sells like the straddle, but every sell is hedged immediately
pub struct IronFly;

impl StrategyVariant for IronFly {
    fn name(&self) -> &str {
        "iron_fly"
    }

    fn entry_strikes(&self, spot: Price, config: &StrategyConfig) -> Vec<(OptionKind, Price)> {
        let atm = nearest_strike(spot + config.bias, config.strike_step);
        vec![(OptionKind::Call, atm), (OptionKind::Put, atm)]
    }

    fn hedge_at_entry(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wings_requested_at_entry() {
        assert!(IronFly.hedge_at_entry());
        let strikes = IronFly.entry_strikes(dec!(24013), &StrategyConfig::default());
        assert_eq!(strikes[0].1, strikes[1].1);
    }
}
