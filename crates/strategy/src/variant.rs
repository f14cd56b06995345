//! Strategy variant trait

use vega_core::{OptionKind, Price, StrategyConfig, StrategyMode};

use crate::iron_fly::IronFly;
use crate::straddle::Straddle;
use crate::strangle::Strangle;

/// Strike selection for a multi-leg entry
///
/// Variants only choose WHERE to sell; all trigger rules (profit cascade,
/// stop-loss, hedge handling, side exits) are shared engine code.
pub trait StrategyVariant: Send + Sync {
    /// Variant name for logging
    fn name(&self) -> &str;

    /// Strikes to sell at entry, one per option kind
    fn entry_strikes(&self, spot: Price, config: &StrategyConfig) -> Vec<(OptionKind, Price)>;

    /// True if sells are hedged immediately at entry rather than only
    /// during the profit cascade
    fn hedge_at_entry(&self) -> bool {
        false
    }
}

/// The variant for a configured mode
pub fn variant_for(mode: StrategyMode) -> Box<dyn StrategyVariant> {
    match mode {
        StrategyMode::Straddle => Box::new(Straddle),
        StrategyMode::Strangle => Box::new(Strangle),
        StrategyMode::IronFly => Box::new(IronFly),
    }
}
