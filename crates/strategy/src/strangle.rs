//! Short strangle: sell call and put away from spot

use rust_decimal_macros::dec;

use crate::variant::StrategyVariant;
use vega_core::{OptionKind, Price, StrategyConfig, nearest_strike};

/// Sells the call above spot and the put below, `strangle_distance` out
pub struct Strangle;

impl StrategyVariant for Strangle {
    fn name(&self) -> &str {
        "strangle"
    }

    fn entry_strikes(&self, spot: Price, config: &StrategyConfig) -> Vec<(OptionKind, Price)> {
        let call = nearest_strike(spot + config.strangle_distance, config.strike_step);
        let put = nearest_strike(spot - config.strangle_distance, config.strike_step);
        vec![(OptionKind::Call, call), (OptionKind::Put, put)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strikes_straddle_spot_symmetrically() {
        let config = StrategyConfig::default(); // distance 1000
        let strikes = Strangle.entry_strikes(dec!(24013), &config);
        assert_eq!(
            strikes,
            vec![(OptionKind::Call, dec!(25000)), (OptionKind::Put, dec!(23000))]
        );
    }
}
