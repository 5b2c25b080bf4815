//! kaos-sequencer - sequence coordination for Disruptor style ring buffers.
//!
//! Producers claim and publish sequence numbers through a [`Sequencer`],
//! consumers wait on a [`SequenceBarrier`], and consumer progress markers
//! registered as gating sequences hold producers back when the ring is full.
//! Slot storage lives outside this crate and is addressed by
//! `sequence % capacity`.
//!
//! ```rust
//! use std::sync::Arc;
//! use kaos_sequencer::{Sequence, Sequencer, ClaimStrategyOption, WaitStrategyOption};
//!
//! let sequencer = Sequencer::new(8, ClaimStrategyOption::SingleThreaded, WaitStrategyOption::Yielding);
//! let consumed = Arc::new(Sequence::default());
//! sequencer.set_gating_sequences(vec![consumed.clone()]);
//! let barrier = sequencer.new_barrier(Vec::new());
//!
//! let seq = sequencer.next();
//! sequencer.publish(seq);
//!
//! let available = barrier.wait_for(0).unwrap();
//! consumed.set(available);
//! assert_eq!(available, 0);
//! ```

pub mod constants;
pub mod disruptor;
pub mod error;
pub mod insights;
pub mod metrics;

pub use constants::INITIAL_CURSOR_VALUE;
pub use disruptor::{
    minimum_sequence,
    AnyClaimStrategy,
    AnyWaitStrategy,
    BatchDescriptor,
    BlockingWaitStrategy,
    BusySpinWaitStrategy,
    ClaimStrategy,
    ClaimStrategyOption,
    MultiThreadedClaimStrategy,
    Sequence,
    SequenceBarrier,
    Sequencer,
    SequencerConfig,
    SingleThreadedClaimStrategy,
    SleepingWaitStrategy,
    WaitStrategy,
    WaitStrategyOption,
    YieldingWaitStrategy,
};
pub use error::{ Result, SequencerError };
pub use insights::{ init_tracy, record_alert, record_backpressure, record_forced_publish };
pub use metrics::{ Metrics, MetricsSnapshot };
