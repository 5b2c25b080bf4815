//! Padded atomic sequence counter.

use std::fmt;
use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;

use static_assertions::const_assert_eq;

use crate::constants::{ INITIAL_CURSOR_VALUE, SEQUENCE_PADDING };

/// Cache-line padded progress counter.
///
/// A producer cursor or a consumer's processed-up-to marker. The 128-byte
/// alignment keeps two neighbouring sequences (say a cursor and a consumer
/// marker allocated next to each other) off each other's cache lines,
/// including the adjacent line the prefetcher pulls in.
///
/// `get` is an acquire load and `set` a release store, so a consumer that
/// observes a value also observes every write made before it was set.
#[repr(align(128))]
pub struct Sequence {
    value: AtomicI64,
}

const_assert_eq!(std::mem::size_of::<Sequence>(), SEQUENCE_PADDING);
const_assert_eq!(std::mem::align_of::<Sequence>(), SEQUENCE_PADDING);

impl Sequence {
    pub const fn new(initial: i64) -> Self {
        Self { value: AtomicI64::new(initial) }
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    /// Store with a full fence, for values read by threads that do not pair
    /// with a matching acquire.
    #[inline]
    pub fn set_volatile(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    #[inline]
    pub fn compare_and_set(&self, expected: i64, new_value: i64) -> bool {
        self.value.compare_exchange(expected, new_value, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    #[inline]
    pub fn increment_and_get(&self) -> i64 {
        self.add_and_get(1)
    }

    #[inline]
    pub fn add_and_get(&self, delta: i64) -> i64 {
        self.value.fetch_add(delta, Ordering::AcqRel) + delta
    }

    /// Raise to `value` if currently lower. Returns the value now held.
    #[inline]
    pub fn set_max(&self, value: i64) -> i64 {
        self.value.fetch_max(value, Ordering::AcqRel).max(value)
    }

    #[inline]
    pub(crate) fn as_atomic(&self) -> &AtomicI64 {
        &self.value
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR_VALUE)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sequence").field(&self.get()).finish()
    }
}

/// Smallest value among `sequences`, or `default` when there are none.
#[inline]
pub fn minimum_sequence(sequences: &[Arc<Sequence>], default: i64) -> i64 {
    sequences
        .iter()
        .map(|s| s.get())
        .min()
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_sequence_starts_at_initial_value() {
        assert_eq!(Sequence::default().get(), INITIAL_CURSOR_VALUE);
        assert_eq!(Sequence::new(7).get(), 7);
    }

    #[test]
    fn test_sequence_operations() {
        let seq = Sequence::default();
        assert_eq!(seq.increment_and_get(), 0);
        assert_eq!(seq.add_and_get(5), 5);

        assert!(seq.compare_and_set(5, 9));
        assert!(!seq.compare_and_set(5, 10));
        assert_eq!(seq.get(), 9);

        seq.set(2);
        assert_eq!(seq.get(), 2);
        seq.set_volatile(3);
        assert_eq!(seq.get(), 3);
    }

    #[test]
    fn test_set_max_never_lowers() {
        let seq = Sequence::new(10);
        assert_eq!(seq.set_max(4), 10);
        assert_eq!(seq.get(), 10);
        assert_eq!(seq.set_max(12), 12);
        assert_eq!(seq.get(), 12);
    }

    #[test]
    fn test_minimum_sequence() {
        let seqs = vec![Arc::new(Sequence::new(5)), Arc::new(Sequence::new(2)), Arc::new(Sequence::new(9))];
        assert_eq!(minimum_sequence(&seqs, i64::MAX), 2);
        assert_eq!(minimum_sequence(&[], 42), 42);
    }

    #[test]
    fn test_concurrent_increments() {
        let seq = Arc::new(Sequence::default());
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let seq = seq.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        seq.increment_and_get();
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(seq.get(), 40_000 + INITIAL_CURSOR_VALUE);
    }
}
