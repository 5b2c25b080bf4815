//! Kaos Sequencer Constants
//!
//! Core constants used by the sequencer, claim and wait strategies.

/// Value of every sequence before anything is produced or consumed
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Bytes reserved per `Sequence` (two cache lines, covers adjacent-line prefetch)
pub const SEQUENCE_PADDING: usize = 128;

/// Default sequencer capacity
pub const DEFAULT_CAPACITY: usize = 1024;

/// Spins before `YieldingWaitStrategy` starts yielding
pub const DEFAULT_YIELD_SPIN_TRIES: u32 = 100;

/// Spins before `SleepingWaitStrategy` starts yielding
pub const DEFAULT_SLEEP_SPIN_TRIES: u32 = 200;

/// Yields before `SleepingWaitStrategy` starts sleeping
pub const DEFAULT_SLEEP_YIELD_TRIES: u32 = 100;

/// First sleep of `SleepingWaitStrategy`, doubled on every idle round
pub const DEFAULT_MIN_SLEEP_NANOS: u64 = 1_000;

/// Sleep cap of `SleepingWaitStrategy`
pub const DEFAULT_MAX_SLEEP_NANOS: u64 = 1_000_000;

/// Upper bound on a single condvar park in `BlockingWaitStrategy`
pub const BLOCKING_PARK_TIMEOUT_MICROS: u64 = 100;

/// Spins before a multi-producer publish yields while waiting its turn
pub const PUBLISH_SPIN_TRIES: u32 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_covers_cache_line() {
        assert!(SEQUENCE_PADDING.is_power_of_two());
        assert!(SEQUENCE_PADDING >= 64);
    }

    #[test]
    fn test_sleep_bounds_are_ordered() {
        assert!(DEFAULT_MIN_SLEEP_NANOS <= DEFAULT_MAX_SLEEP_NANOS);
    }
}
