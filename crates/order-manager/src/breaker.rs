//! Circuit breaker over broker submissions
//!
//! CLOSED counts consecutive failures; at the trip threshold the breaker
//! OPENs and every submission is refused locally without touching the
//! broker. After the cool-down the next permit check moves to HALF_OPEN:
//! one probe submission is let through, success closes the breaker,
//! failure reopens it and restarts the cool-down. An operator reset
//! closes it immediately.

use chrono::Duration;
use log::{info, warn};

use vega_core::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: BreakerState,
    consecutive_failures: u32,
    trip_threshold: u32,
    cooldown: Duration,
    opened_at: Option<Timestamp>,
}

impl CircuitBreaker {
    pub fn new(trip_threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            trip_threshold,
            cooldown,
            opened_at: None,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// True if a submission may proceed at `now`
    ///
    /// Transitions OPEN to HALF_OPEN once the cool-down has elapsed.
    pub fn permit(&mut self, now: Timestamp) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed_cooldown = self
                    .opened_at
                    .map(|t| now - t >= self.cooldown)
                    .unwrap_or(true);
                if elapsed_cooldown {
                    info!("[Breaker] Cool-down elapsed, half-open probe allowed");
                    self.state = BreakerState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful submission
    pub fn record_success(&mut self) {
        if self.state == BreakerState::HalfOpen {
            info!("[Breaker] Probe succeeded, closing");
        }
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    /// Record a failed submission, tripping when the threshold is hit
    pub fn record_failure(&mut self, now: Timestamp) {
        match self.state {
            BreakerState::HalfOpen => {
                warn!("[Breaker] Probe failed, reopening");
                self.state = BreakerState::Open;
                self.opened_at = Some(now);
            }
            BreakerState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.trip_threshold {
                    warn!(
                        "[Breaker] Tripped after {} consecutive failures",
                        self.consecutive_failures
                    );
                    self.state = BreakerState::Open;
                    self.opened_at = Some(now);
                }
            }
            BreakerState::Open => {}
        }
    }

    /// Operator reset: close immediately and clear the failure count
    pub fn reset(&mut self) {
        info!("[Breaker] Manual reset");
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }
}
