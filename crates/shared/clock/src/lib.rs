//! Vega Clock Infrastructure
//!
//! Time sources for production and tests:
//! - `SystemClock`: wall-clock time for live runs
//! - `FixedClock`: frozen, explicitly advanced time for deterministic tests
//!
//! All time-dependent logic (trading-window gating, quote staleness,
//! expiry distance, breaker cool-downs) goes through the `Clock` port so
//! tests can pin the clock to any instant.

mod fixed;
mod system;

pub use fixed::FixedClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use vega_ports::Clock;
