//! Consumer-side verification helpers.
//!
//! Producers stamp each claimed slot with its own sequence in a `SlotRing`
//! before publishing; consumers read the stamp back through a barrier and feed
//! it to a `SequenceChecker`. A stale or foreign stamp means the sequencer let
//! a consumer read a slot that was not yet published, or let a producer wrap
//! over a slot that was not yet consumed.

use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;
use std::thread::{ self, JoinHandle };

use kaos_sequencer::{ Sequence, SequenceBarrier, SequencerError, WaitStrategy, INITIAL_CURSOR_VALUE };

/// Fixed ring of sequence stamps, one per slot.
pub struct SlotRing {
    slots: Box<[AtomicI64]>,
}

impl SlotRing {
    pub fn new(capacity: usize) -> Arc<Self> {
        let slots = (0..capacity).map(|_| AtomicI64::new(INITIAL_CURSOR_VALUE)).collect();
        Arc::new(Self { slots })
    }

    #[inline]
    fn index(&self, sequence: i64) -> usize {
        (sequence as usize) % self.slots.len()
    }

    /// Producer side: stamp the slot owned by `sequence`.
    #[inline]
    pub fn write(&self, sequence: i64) {
        self.slots[self.index(sequence)].store(sequence, Ordering::Relaxed);
    }

    /// Consumer side: read the stamp in the slot owned by `sequence`.
    #[inline]
    pub fn read(&self, sequence: i64) -> i64 {
        self.slots[self.index(sequence)].load(Ordering::Relaxed)
    }
}

/// Tracks the next expected sequence and counts anything out of line.
#[derive(Debug)]
pub struct SequenceChecker {
    next: i64,
    gaps: u64,
    duplicates: u64,
    seen: u64,
}

impl Default for SequenceChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceChecker {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(first: i64) -> Self {
        Self { next: first, gaps: 0, duplicates: 0, seen: 0 }
    }

    /// Record one observed sequence. Returns `false` if it was not the one
    /// expected next.
    pub fn observe(&mut self, sequence: i64) -> bool {
        self.seen += 1;
        if sequence == self.next {
            self.next += 1;
            return true;
        }
        if sequence > self.next {
            self.gaps += 1;
            self.next = sequence + 1;
        } else {
            self.duplicates += 1;
        }
        false
    }

    pub fn next_expected(&self) -> i64 {
        self.next
    }

    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn is_clean(&self) -> bool {
        self.gaps == 0 && self.duplicates == 0
    }
}

/// What a consumer thread saw before it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Last sequence processed
    pub last: i64,
    /// Slots processed
    pub consumed: u64,
    /// Slots whose stamp did not match their sequence
    pub mismatches: u64,
    /// `wait_for` calls that returned more than one sequence
    pub batches: u64,
    /// Whether the consumer stopped because its barrier was alerted
    pub alerted: bool,
}

/// Spawn a consumer that walks `barrier` up to and including `last`,
/// checking every slot stamp and advancing `progress` after each batch.
///
/// Stops early if the barrier is alerted.
pub fn spawn_consumer<W>(
    barrier: Arc<SequenceBarrier<W>>,
    progress: Arc<Sequence>,
    slots: Arc<SlotRing>,
    last: i64
) -> JoinHandle<ConsumerReport>
    where W: WaitStrategy + Send + Sync + 'static
{
    thread::spawn(move || {
        let mut checker = SequenceChecker::starting_at(progress.get() + 1);
        let mut report = ConsumerReport {
            last: progress.get(),
            consumed: 0,
            mismatches: 0,
            batches: 0,
            alerted: false,
        };

        while report.last < last {
            let next = report.last + 1;
            let available = match barrier.wait_for(next) {
                Ok(available) => available.min(last),
                Err(SequencerError::Alerted) => {
                    report.alerted = true;
                    break;
                }
                Err(_) => break,
            };

            if available > next {
                report.batches += 1;
            }
            for sequence in next..=available {
                if slots.read(sequence) != sequence || !checker.observe(sequence) {
                    report.mismatches += 1;
                }
                report.consumed += 1;
            }
            report.last = available;
            progress.set(available);
        }

        report
    })
}
