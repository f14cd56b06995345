//! Engine lifecycle states

/// State machine of the decision engine
///
/// ```text
/// IDLE ─► CONNECTED ─► MONITORING ─► EVALUATING ─► ORDER_PENDING ─► RECONCILED
///                            ▲                                          │
///                            └──────────────────────────────────────────┘
/// ANY ─► LOCKED        (circuit breaker tripped)
/// ANY ─► LIQUIDATING ─► IDLE   (risk-triggered shutdown)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not connected to market data
    Idle,
    /// Feed live, no evaluation yet
    Connected,
    /// Watching ticks between cycles
    Monitoring,
    /// Mid-cycle, computing intents
    Evaluating,
    /// Intents handed to the order manager
    OrderPending,
    /// All intents of the cycle reached terminal state
    Reconciled,
    /// Circuit breaker open; no new decisions
    Locked,
    /// Closing everything; ends in Idle
    Liquidating,
}

impl EngineState {
    /// True if the engine may run an evaluation cycle
    pub fn can_evaluate(&self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Monitoring | Self::Reconciled
        )
    }
}
