//! Sequencer: claim, publish and gating for one ring.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::disruptor::barrier::SequenceBarrier;
use crate::disruptor::batch::BatchDescriptor;
use crate::disruptor::claim_strategy::{ AnyClaimStrategy, ClaimStrategy, ClaimStrategyOption };
use crate::disruptor::sequence::{ minimum_sequence, Sequence };
use crate::disruptor::wait_strategy::{ AnyWaitStrategy, WaitStrategy, WaitStrategyOption };
use crate::disruptor::SequencerConfig;
use crate::error::{ Result, SequencerError };
use crate::insights::{ record_backpressure, record_forced_publish };
use crate::metrics::{ Metrics, MetricsSnapshot };

/// Central coordinator between producers and consumers.
///
/// Owns the published cursor, the claim strategy, the wait strategy and the
/// gating sequences (the progress markers of the slowest consumers). Producers
/// call `next`/`publish`; consumers get a `SequenceBarrier` from
/// `new_barrier`. The gating set sits behind an `ArcSwap`, so replacing it is a
/// single pointer swap and readers never see a half-updated set.
pub struct Sequencer<C: ClaimStrategy = AnyClaimStrategy, W: WaitStrategy = AnyWaitStrategy> {
    capacity: i64,
    cursor: Arc<Sequence>,
    claim_strategy: C,
    wait_strategy: Arc<W>,
    gating_sequences: ArcSwap<Vec<Arc<Sequence>>>,
    metrics: Arc<Metrics>,
}

impl Sequencer {
    /// # Panics
    /// If `capacity` is zero or does not fit in an `i64`.
    pub fn new(capacity: usize, claim: ClaimStrategyOption, wait: WaitStrategyOption) -> Self {
        let capacity = checked_capacity(capacity);
        Self::with_strategies(capacity as usize, AnyClaimStrategy::new(claim, capacity), AnyWaitStrategy::from(wait))
    }

    pub fn from_config(config: &SequencerConfig) -> Self {
        Self::new(config.capacity, config.claim_strategy, config.wait_strategy)
    }
}

fn checked_capacity(capacity: usize) -> i64 {
    match i64::try_from(capacity) {
        Ok(c) if c > 0 => c,
        _ => panic!("sequencer capacity must be in 1..=i64::MAX, got {capacity}"),
    }
}

impl<C: ClaimStrategy, W: WaitStrategy> Sequencer<C, W> {
    /// Build with explicit strategies.
    ///
    /// # Panics
    /// If `claim_strategy` was created for a different capacity.
    pub fn with_strategies(capacity: usize, claim_strategy: C, wait_strategy: W) -> Self {
        let capacity = checked_capacity(capacity);
        assert_eq!(
            claim_strategy.capacity(),
            capacity,
            "claim strategy capacity does not match sequencer capacity"
        );
        Self {
            capacity,
            cursor: Arc::new(Sequence::default()),
            claim_strategy,
            wait_strategy: Arc::new(wait_strategy),
            gating_sequences: ArcSwap::from_pointee(Vec::new()),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Highest published sequence.
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor.get()
    }

    #[inline]
    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Highest claimed sequence, published or not.
    #[inline]
    pub fn claimed(&self) -> i64 {
        self.claim_strategy.sequence()
    }

    /// Whether one more slot can be claimed without overwriting a slot some
    /// gating sequence has not consumed yet.
    pub fn has_available_capacity(&self) -> bool {
        self.claim_strategy.has_available_capacity(&self.gating_sequences.load(), 1, self.cursor.get())
    }

    pub fn remaining_capacity(&self) -> i64 {
        self.capacity - self.occupied_capacity()
    }

    /// Published slots not yet consumed by the slowest gating sequence.
    pub fn occupied_capacity(&self) -> i64 {
        let cursor = self.cursor.get();
        cursor - minimum_sequence(&self.gating_sequences.load(), cursor)
    }

    /// Claim the next sequence, waiting for consumers if the ring is full.
    pub fn next(&self) -> i64 {
        self.claim_and_wait(1)
    }

    /// Claim `batch.size()` contiguous sequences as one unit.
    ///
    /// # Panics
    /// If the batch is larger than the ring.
    pub fn next_batch(&self, batch: &mut BatchDescriptor) {
        assert!(
            batch.size() <= self.capacity,
            "batch of {} exceeds capacity {}",
            batch.size(),
            self.capacity
        );
        batch.set_end(self.claim_and_wait(batch.size()));
    }

    /// Claim the next sequence only if capacity allows.
    ///
    /// # Errors
    /// `SequencerError::InsufficientCapacity` when the ring is full.
    pub fn try_next(&self) -> Result<i64> {
        self.try_claim(1)
    }

    /// Non-blocking `next_batch`.
    ///
    /// # Errors
    /// `SequencerError::InsufficientCapacity` when fewer than `batch.size()`
    /// slots are free; `batch` is left untouched.
    pub fn try_next_batch(&self, batch: &mut BatchDescriptor) -> Result<()> {
        batch.set_end(self.try_claim(batch.size())?);
        Ok(())
    }

    /// Force the claimed marker to `sequence`, skipping the capacity check.
    ///
    /// For restoring from a snapshot. The cursor is untouched until
    /// `sequence` is published, either with `publish` or with
    /// `force_publish`. Neither waits for sequences below `sequence`, which
    /// are treated as already handled. Gating sequences must already reflect
    /// consumption up to `sequence`.
    pub fn claim(&self, sequence: i64) -> i64 {
        self.claim_strategy.set_sequence(sequence);
        sequence
    }

    /// Make `sequence` visible to consumers.
    ///
    /// With multiple producers this waits until every earlier claim has been
    /// published, so the cursor never skips an unpublished sequence.
    ///
    /// # Panics
    /// If `sequence` was never claimed, or the cursor is already at or past
    /// it.
    pub fn publish(&self, sequence: i64) {
        self.publish_range(sequence, 1);
    }

    /// Publish a claimed batch as one cursor advance to `batch.end()`.
    pub fn publish_batch(&self, batch: &BatchDescriptor) {
        self.publish_range(batch.end(), batch.size());
    }

    /// Move the cursor to `sequence` without a matching claim. Never moves it
    /// backwards.
    pub fn force_publish(&self, sequence: i64) {
        self.cursor.set_max(sequence);
        self.metrics.record_forced_publish();
        record_forced_publish(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }

    /// Replace the consumer progress markers producers are gated on.
    pub fn set_gating_sequences(&self, sequences: Vec<Arc<Sequence>>) {
        self.gating_sequences.store(Arc::new(sequences));
    }

    pub fn gating_sequences(&self) -> Arc<Vec<Arc<Sequence>>> {
        self.gating_sequences.load_full()
    }

    /// Barrier over this sequencer's cursor, additionally gated by
    /// `dependents` (upstream consumer stages).
    pub fn new_barrier(&self, dependents: Vec<Arc<Sequence>>) -> SequenceBarrier<W> {
        SequenceBarrier::new(self.cursor.clone(), dependents, self.wait_strategy.clone(), self.metrics.clone())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn claim_and_wait(&self, delta: i64) -> i64 {
        let sequence = self.claim_strategy.increment_and_get(delta);
        self.wait_for_capacity(sequence);
        sequence
    }

    fn wait_for_capacity(&self, sequence: i64) {
        let wrap_point = sequence - self.capacity;
        let mut min_gating = minimum_sequence(&self.gating_sequences.load(), i64::MAX);
        if wrap_point <= min_gating {
            return;
        }

        self.metrics.record_backpressure();
        record_backpressure(sequence, min_gating);

        let mut counter = 0u32;
        while wrap_point > min_gating {
            self.wait_strategy.back_off(&mut counter);
            min_gating = minimum_sequence(&self.gating_sequences.load(), i64::MAX);
        }
    }

    fn try_claim(&self, delta: i64) -> Result<i64> {
        let gating = self.gating_sequences.load();
        match self.claim_strategy.try_increment_and_get(&gating, delta, self.cursor.get()) {
            Some(sequence) => Ok(sequence),
            None => {
                self.metrics.record_capacity_rejection();
                Err(SequencerError::insufficient_capacity(delta))
            }
        }
    }

    fn publish_range(&self, sequence: i64, batch_size: i64) {
        assert!(
            sequence <= self.claim_strategy.sequence(),
            "publishing unclaimed sequence {sequence} (claimed up to {})",
            self.claim_strategy.sequence()
        );
        self.claim_strategy.serialise_publishing(sequence, &self.cursor, batch_size);
        let cursor = self.cursor.get();
        assert!(sequence > cursor, "sequence {sequence} already published (cursor at {cursor})");
        self.cursor.set(sequence);
        self.wait_strategy.signal_all_when_blocking();
    }
}

impl<C: ClaimStrategy, W: WaitStrategy> std::fmt::Debug for Sequencer<C, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("capacity", &self.capacity)
            .field("cursor", &self.cursor.get())
            .field("claimed", &self.claim_strategy.sequence())
            .field("gating_sequences", &self.gating_sequences.load_full())
            .finish()
    }
}
