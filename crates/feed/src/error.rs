//! Error types for the feed crate

use thiserror::Error;

/// Feed-level errors
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Subscription failed: {0}")]
    Subscribe(String),

    #[error("Tick stream ended")]
    StreamEnded,

    #[error("Feed unavailable after {0} reconnect attempts")]
    Unavailable(u32),

    #[error("Channel closed")]
    ChannelClosed,
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
