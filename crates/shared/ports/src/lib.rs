//! Vega Ports
//!
//! Port definitions (traits) for the Vega trading system.
//! These define the boundaries between domain logic and infrastructure.

mod broker;
mod clock;
mod journal;
mod session;

pub use broker::{
    BrokerClient, BrokerError, BrokerOrder, BrokerPosition, BrokerResult, OrderRequest,
    OrderState, Quote,
};
pub use clock::Clock;
pub use journal::JournalSink;
pub use session::{SessionHandle, SessionProvider};
