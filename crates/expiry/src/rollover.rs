//! Rollover decisions per leg

use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;

use crate::calendar::ExpiryCalendar;
use vega_core::{Leg, LegSide, StrategyConfig};

/// What to do with a leg approaching expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverAction {
    /// Leave the leg alone
    None,
    /// Close and reopen at the next weekly expiry
    RollToNextWeek,
    /// Close and reopen at the far-month expiry
    RollToFarMonth,
    /// Expiry day: replace with a fresh position after settlement risk
    /// is off the book
    ExpiryDayReplace,
}

/// Decides rollovers from the calendar and a leg's state
pub struct ExpiryManager {
    calendar: ExpiryCalendar,
    config: Arc<StrategyConfig>,
}

impl ExpiryManager {
    pub fn new(calendar: ExpiryCalendar, config: Arc<StrategyConfig>) -> Self {
        Self { calendar, config }
    }

    pub fn calendar(&self) -> &ExpiryCalendar {
        &self.calendar
    }

    /// The action for this leg today
    ///
    /// A leg already marked `rolled` never rolls again within its expiry
    /// cycle; repeat invocation is a no-op.
    pub fn next_action(&self, leg: &Leg, today: NaiveDate) -> RolloverAction {
        if !leg.is_active() || leg.rolled {
            return RolloverAction::None;
        }

        let days = leg.contract.days_to_expiry(today);
        if days < 0 {
            // Already settled; nothing to roll
            return RolloverAction::None;
        }
        if days == 0 {
            debug!("[Expiry] Leg {} expires today", leg.id);
            return RolloverAction::ExpiryDayReplace;
        }
        if days <= self.config.rollover_days_threshold {
            if self.config.far_sell_add && leg.side == LegSide::Sell {
                return RolloverAction::RollToFarMonth;
            }
            return RolloverAction::RollToNextWeek;
        }
        RolloverAction::None
    }

    /// Target expiry date for rolling the given leg
    ///
    /// Weekly rolls step off the OUTGOING leg's expiry, not today: a roll
    /// decided the day before settlement must still land past the current
    /// contract, or the replacement would re-roll every cycle.
    pub fn target_expiry(
        &self,
        action: RolloverAction,
        leg: &Leg,
        today: NaiveDate,
    ) -> Option<NaiveDate> {
        match action {
            RolloverAction::None => None,
            RolloverAction::RollToNextWeek | RolloverAction::ExpiryDayReplace => {
                Some(self.calendar.weekly_after(leg.contract.expiry))
            }
            RolloverAction::RollToFarMonth => {
                self.calendar.far_month(today, self.config.far_month_index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use vega_core::{OptionContract, OptionKind};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sell_leg(expiry: NaiveDate) -> Leg {
        let contract = OptionContract::new("NIFTY", expiry, dec!(24000), OptionKind::Call);
        Leg::new_sell(contract, dec!(50), dec!(100), Utc::now())
    }

    fn manager(far_sell_add: bool) -> ExpiryManager {
        let config = Arc::new(StrategyConfig {
            far_sell_add,
            ..StrategyConfig::default()
        });
        ExpiryManager::new(ExpiryCalendar::weekly_thursday(), config)
    }

    #[test]
    fn test_no_action_far_from_expiry() {
        let mgr = manager(false);
        let leg = sell_leg(d(2025, 9, 25));
        assert_eq!(mgr.next_action(&leg, d(2025, 9, 20)), RolloverAction::None);
    }

    #[test]
    fn test_rolls_within_threshold() {
        let mgr = manager(false);
        let leg = sell_leg(d(2025, 9, 25));
        // 2 days out: at the threshold
        assert_eq!(
            mgr.next_action(&leg, d(2025, 9, 23)),
            RolloverAction::RollToNextWeek
        );
    }

    #[test]
    fn test_far_sell_add_rolls_to_far_month() {
        let mgr = manager(true);
        let leg = sell_leg(d(2025, 9, 25));
        let action = mgr.next_action(&leg, d(2025, 9, 23));
        assert_eq!(action, RolloverAction::RollToFarMonth);
        // Third monthly from Sep 23: Sep 25, Oct 30, Nov 27
        assert_eq!(
            mgr.target_expiry(action, &leg, d(2025, 9, 23)),
            Some(d(2025, 11, 27))
        );
    }

    #[test]
    fn test_roll_target_steps_off_the_outgoing_expiry() {
        let mgr = manager(false);
        let leg = sell_leg(d(2025, 9, 25));
        // Decided the day before settlement: the target must clear the
        // current contract, not re-select it
        let action = mgr.next_action(&leg, d(2025, 9, 24));
        assert_eq!(action, RolloverAction::RollToNextWeek);
        assert_eq!(
            mgr.target_expiry(action, &leg, d(2025, 9, 24)),
            Some(d(2025, 10, 2))
        );
    }

    #[test]
    fn test_expiry_day_replace() {
        let mgr = manager(false);
        let leg = sell_leg(d(2025, 9, 25));
        let action = mgr.next_action(&leg, d(2025, 9, 25));
        assert_eq!(action, RolloverAction::ExpiryDayReplace);
        assert_eq!(
            mgr.target_expiry(action, &leg, d(2025, 9, 25)),
            Some(d(2025, 10, 2))
        );
    }

    #[test]
    fn test_rolled_marker_is_idempotent() {
        let mgr = manager(true);
        let mut leg = sell_leg(d(2025, 9, 25));
        assert_eq!(
            mgr.next_action(&leg, d(2025, 9, 23)),
            RolloverAction::RollToFarMonth
        );

        leg.rolled = true;
        assert_eq!(mgr.next_action(&leg, d(2025, 9, 23)), RolloverAction::None);
    }

    #[test]
    fn test_hedge_rolls_weekly_even_with_far_sell_add() {
        let mgr = manager(true);
        let sell = sell_leg(d(2025, 9, 25));
        let hedge_contract = OptionContract::new("NIFTY", d(2025, 9, 25), dec!(24200), OptionKind::Call);
        let hedge = Leg::new_hedge(hedge_contract, dec!(50), dec!(40), sell.id, Utc::now());
        assert_eq!(
            mgr.next_action(&hedge, d(2025, 9, 23)),
            RolloverAction::RollToNextWeek
        );
    }
}
