//! Sequence coordination (LMAX Disruptor pattern).
//!
//! - `Sequence` - padded atomic progress counter
//! - `Sequencer` - claim/publish for producers, gating on consumers
//! - `SequenceBarrier` - consumer view of what is safe to read
//! - `ClaimStrategy` - single or multiple producers
//! - `WaitStrategy` - busy-spin, yielding, sleeping, blocking

pub mod barrier;
pub mod batch;
pub mod claim_strategy;
pub mod sequence;
pub mod sequencer;
pub mod wait_strategy;

pub use barrier::SequenceBarrier;
pub use batch::BatchDescriptor;
pub use claim_strategy::{
    AnyClaimStrategy,
    ClaimStrategy,
    ClaimStrategyOption,
    MultiThreadedClaimStrategy,
    SingleThreadedClaimStrategy,
};
pub use sequence::{ minimum_sequence, Sequence };
pub use sequencer::Sequencer;
pub use wait_strategy::{
    AnyWaitStrategy,
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    SleepingWaitStrategy,
    WaitStrategy,
    WaitStrategyOption,
    YieldingWaitStrategy,
};

use crate::constants::DEFAULT_CAPACITY;
use crate::error::{ Result, SequencerError };

/// Construction-time knobs for a `Sequencer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Ring capacity (any positive value; powers of two let storage mask)
    pub capacity: usize,
    pub claim_strategy: ClaimStrategyOption,
    pub wait_strategy: WaitStrategyOption,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            claim_strategy: ClaimStrategyOption::default(),
            wait_strategy: WaitStrategyOption::default(),
        }
    }
}

impl SequencerConfig {
    /// Create a new configuration with the specified capacity
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SequencerError::config("Capacity must be greater than 0"));
        }
        if i64::try_from(capacity).is_err() {
            return Err(SequencerError::config("Capacity must fit in a signed 64-bit sequence"));
        }

        Ok(Self {
            capacity,
            ..Default::default()
        })
    }

    pub fn with_claim_strategy(mut self, claim_strategy: ClaimStrategyOption) -> Self {
        self.claim_strategy = claim_strategy;
        self
    }

    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategyOption) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    pub fn build(&self) -> Sequencer {
        Sequencer::from_config(self)
    }
}
