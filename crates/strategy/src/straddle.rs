//! Short straddle: sell call and put at the ATM strike

use rust_decimal_macros::dec;

use crate::variant::StrategyVariant;
use vega_core::{OptionKind, Price, StrategyConfig, nearest_strike};

/// Sells both kinds at the strike nearest to spot, shifted by `bias`
pub struct Straddle;

impl StrategyVariant for Straddle {
    fn name(&self) -> &str {
        "straddle"
    }

    fn entry_strikes(&self, spot: Price, config: &StrategyConfig) -> Vec<(OptionKind, Price)> {
        let atm = nearest_strike(spot + config.bias, config.strike_step);
        vec![(OptionKind::Call, atm), (OptionKind::Put, atm)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atm_strike_selection() {
        let config = StrategyConfig::default();
        let strikes = Straddle.entry_strikes(dec!(24013), &config);
        assert_eq!(
            strikes,
            vec![(OptionKind::Call, dec!(24000)), (OptionKind::Put, dec!(24000))]
        );
    }

    #[test]
    fn test_bias_shifts_strike() {
        let config = StrategyConfig {
            bias: dec!(50),
            ..StrategyConfig::default()
        };
        let strikes = Straddle.entry_strikes(dec!(24013), &config);
        assert_eq!(strikes[0].1, dec!(24050));
    }
}
