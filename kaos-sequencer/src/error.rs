//! Error types for kaos-sequencer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SequencerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    /// The barrier was alerted before or during a wait
    #[error("Sequence barrier alerted")]
    Alerted,

    /// A non-blocking claim found no free slots
    #[error("Insufficient capacity: {requested} slot(s) requested")]
    InsufficientCapacity { requested: i64 },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl SequencerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    pub fn insufficient_capacity(requested: i64) -> Self {
        Self::InsufficientCapacity { requested }
    }

    /// Alerts and capacity misses are expected at runtime; bad config is not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Alerted | Self::InsufficientCapacity { .. })
    }
}
