//! # kaos-sequencer-test-support
//!
//! Testing infrastructure for kaos-sequencer.
//!
//! ## Components
//!
//! - **StressRunner** - Time-boxed producer/consumer runs with progress output
//! - **SequenceChecker** - Detects gaps and reordering in consumed sequences
//! - **SlotRing** - Per-slot sequence stamps written by producers
//! - **spawn_consumer** - A checking consumer loop over a `SequenceBarrier`

pub mod stress;
pub mod verify;

pub use stress::{ print_summary, StressConfig, StressCounters, StressMetrics, StressRunner };
pub use verify::{ spawn_consumer, ConsumerReport, SequenceChecker, SlotRing };
