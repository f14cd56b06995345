//! Vega Expiry Management
//!
//! Option expiry calendar and rollover decisions:
//! - weekly expiries on the exchange's weekly settlement day
//! - monthly expiry = last settlement weekday of the month
//! - "far month" = the configured index into the upcoming monthly list
//! - holiday-adjusted: an expiry falling on a holiday moves to the
//!   previous trading day
//!
//! Rollover decisions are pure calendar math over a leg's contract and
//! `rolled` marker; executing the roll is the order manager's job.

mod calendar;
mod rollover;

pub use calendar::ExpiryCalendar;
pub use rollover::{ExpiryManager, RolloverAction};
