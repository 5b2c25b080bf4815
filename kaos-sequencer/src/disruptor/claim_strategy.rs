//! Claim strategies: how producers obtain sequence numbers.
//!
//! - `SingleThreadedClaimStrategy` - one producer thread, plain counter
//! - `MultiThreadedClaimStrategy` - any number of producers, CAS loop and
//!   serialized publishing

use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;
use std::thread;

use crate::constants::{ INITIAL_CURSOR_VALUE, PUBLISH_SPIN_TRIES };
use crate::disruptor::sequence::{ minimum_sequence, Sequence };

/// Producer-side claim policy.
pub trait ClaimStrategy: Send + Sync {
    /// Ring capacity this strategy checks claims against.
    fn capacity(&self) -> i64;

    /// Highest sequence claimed so far.
    fn sequence(&self) -> i64;

    /// Claim `delta` contiguous sequences, returning the last one. No
    /// capacity check.
    fn increment_and_get(&self, delta: i64) -> i64;

    /// Force the claimed marker to `value`. Sequences up to and including
    /// `value` count as claimed, and `value` itself may then be published
    /// without waiting for any predecessor.
    fn set_sequence(&self, value: i64);

    /// Whether `delta` more sequences could be claimed without wrapping over
    /// the slowest of `gating`. An empty `gating` never blocks.
    fn has_available_capacity(&self, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> bool;

    /// Claim `delta` sequences only if capacity allows, returning the last one.
    fn try_increment_and_get(&self, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> Option<i64>;

    /// Block until every sequence below the batch ending at `sequence` has
    /// been published through `cursor`.
    fn serialise_publishing(&self, sequence: i64, cursor: &Sequence, batch_size: i64);
}

#[inline]
fn fits(capacity: i64, claimed: i64, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> bool {
    let wrap_point = claimed.max(cursor) + delta - capacity;
    wrap_point <= minimum_sequence(gating, i64::MAX)
}

/// Claim strategy for exactly one producer thread.
///
/// The claimed marker is only ever touched by that thread, so claims are a
/// relaxed load and store rather than a read-modify-write.
#[derive(Debug)]
pub struct SingleThreadedClaimStrategy {
    capacity: i64,
    claimed: Sequence,
}

impl SingleThreadedClaimStrategy {
    pub fn new(capacity: i64) -> Self {
        assert!(capacity > 0, "capacity must be positive, got {capacity}");
        Self { capacity, claimed: Sequence::new(INITIAL_CURSOR_VALUE) }
    }

    #[inline]
    fn load(&self) -> i64 {
        self.claimed_atomic().load(Ordering::Relaxed)
    }

    #[inline]
    fn store(&self, value: i64) {
        self.claimed_atomic().store(value, Ordering::Relaxed);
    }

    #[inline]
    fn claimed_atomic(&self) -> &AtomicI64 {
        self.claimed.as_atomic()
    }
}

impl ClaimStrategy for SingleThreadedClaimStrategy {
    #[inline]
    fn capacity(&self) -> i64 {
        self.capacity
    }

    #[inline]
    fn sequence(&self) -> i64 {
        self.load()
    }

    #[inline]
    fn increment_and_get(&self, delta: i64) -> i64 {
        let next = self.load() + delta;
        self.store(next);
        next
    }

    fn set_sequence(&self, value: i64) {
        self.store(value);
    }

    fn has_available_capacity(&self, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> bool {
        fits(self.capacity, self.load(), gating, delta, cursor)
    }

    fn try_increment_and_get(&self, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> Option<i64> {
        let claimed = self.load();
        if !fits(self.capacity, claimed, gating, delta, cursor) {
            return None;
        }
        let next = claimed + delta;
        self.store(next);
        Some(next)
    }

    #[inline]
    fn serialise_publishing(&self, _sequence: i64, _cursor: &Sequence, _batch_size: i64) {}
}

/// Claim strategy for concurrent producers.
///
/// Each producer wins a disjoint range with a CAS on the shared marker.
/// Publishing is serialized in claim order: a producer publishing the batch
/// ending at N waits for the cursor to reach N - batch_size first, so the
/// cursor never exposes a sequence whose predecessor is still being written.
///
/// `restored` is the last value forced through `set_sequence`. Nothing will
/// ever publish the sequences below it, so publishing it does not wait.
#[derive(Debug)]
pub struct MultiThreadedClaimStrategy {
    capacity: i64,
    claimed: Sequence,
    restored: Sequence,
}

impl MultiThreadedClaimStrategy {
    pub fn new(capacity: i64) -> Self {
        assert!(capacity > 0, "capacity must be positive, got {capacity}");
        Self {
            capacity,
            claimed: Sequence::new(INITIAL_CURSOR_VALUE),
            restored: Sequence::new(INITIAL_CURSOR_VALUE),
        }
    }
}

impl ClaimStrategy for MultiThreadedClaimStrategy {
    #[inline]
    fn capacity(&self) -> i64 {
        self.capacity
    }

    #[inline]
    fn sequence(&self) -> i64 {
        self.claimed.get()
    }

    fn increment_and_get(&self, delta: i64) -> i64 {
        loop {
            let current = self.claimed.get();
            let next = current + delta;
            if self.claimed.compare_and_set(current, next) {
                return next;
            }
            std::hint::spin_loop();
        }
    }

    fn set_sequence(&self, value: i64) {
        self.restored.set(value);
        self.claimed.set(value);
    }

    fn has_available_capacity(&self, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> bool {
        fits(self.capacity, self.claimed.get(), gating, delta, cursor)
    }

    fn try_increment_and_get(&self, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> Option<i64> {
        loop {
            let current = self.claimed.get();
            if !fits(self.capacity, current, gating, delta, cursor) {
                return None;
            }
            let next = current + delta;
            if self.claimed.compare_and_set(current, next) {
                return Some(next);
            }
            std::hint::spin_loop();
        }
    }

    fn serialise_publishing(&self, sequence: i64, cursor: &Sequence, batch_size: i64) {
        let expected = sequence - batch_size;
        if expected < self.restored.get() {
            return;
        }
        let mut counter = 0u32;
        while cursor.get() < expected {
            if counter < PUBLISH_SPIN_TRIES {
                std::hint::spin_loop();
                counter += 1;
            } else {
                thread::yield_now();
            }
        }
    }
}

/// Claim strategy selection knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimStrategyOption {
    #[default]
    SingleThreaded,
    MultiThreaded,
}

/// Closed set of claim strategies, dispatched by tag.
#[derive(Debug)]
pub enum AnyClaimStrategy {
    SingleThreaded(SingleThreadedClaimStrategy),
    MultiThreaded(MultiThreadedClaimStrategy),
}

impl AnyClaimStrategy {
    pub fn new(option: ClaimStrategyOption, capacity: i64) -> Self {
        match option {
            ClaimStrategyOption::SingleThreaded => {
                Self::SingleThreaded(SingleThreadedClaimStrategy::new(capacity))
            }
            ClaimStrategyOption::MultiThreaded => {
                Self::MultiThreaded(MultiThreadedClaimStrategy::new(capacity))
            }
        }
    }
}

impl ClaimStrategy for AnyClaimStrategy {
    #[inline]
    fn capacity(&self) -> i64 {
        match self {
            Self::SingleThreaded(s) => s.capacity(),
            Self::MultiThreaded(s) => s.capacity(),
        }
    }

    #[inline]
    fn sequence(&self) -> i64 {
        match self {
            Self::SingleThreaded(s) => s.sequence(),
            Self::MultiThreaded(s) => s.sequence(),
        }
    }

    #[inline]
    fn increment_and_get(&self, delta: i64) -> i64 {
        match self {
            Self::SingleThreaded(s) => s.increment_and_get(delta),
            Self::MultiThreaded(s) => s.increment_and_get(delta),
        }
    }

    fn set_sequence(&self, value: i64) {
        match self {
            Self::SingleThreaded(s) => s.set_sequence(value),
            Self::MultiThreaded(s) => s.set_sequence(value),
        }
    }

    #[inline]
    fn has_available_capacity(&self, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> bool {
        match self {
            Self::SingleThreaded(s) => s.has_available_capacity(gating, delta, cursor),
            Self::MultiThreaded(s) => s.has_available_capacity(gating, delta, cursor),
        }
    }

    #[inline]
    fn try_increment_and_get(&self, gating: &[Arc<Sequence>], delta: i64, cursor: i64) -> Option<i64> {
        match self {
            Self::SingleThreaded(s) => s.try_increment_and_get(gating, delta, cursor),
            Self::MultiThreaded(s) => s.try_increment_and_get(gating, delta, cursor),
        }
    }

    #[inline]
    fn serialise_publishing(&self, sequence: i64, cursor: &Sequence, batch_size: i64) {
        match self {
            Self::SingleThreaded(s) => s.serialise_publishing(sequence, cursor, batch_size),
            Self::MultiThreaded(s) => s.serialise_publishing(sequence, cursor, batch_size),
        }
    }
}
