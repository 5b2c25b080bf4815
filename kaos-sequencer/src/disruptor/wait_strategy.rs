//! Wait strategies for sequence barriers and gated producers.
//!
//! A wait strategy decides how a thread idles while a sequence it needs is not
//! there yet. Consumers use `wait_for` through a `SequenceBarrier`; producers
//! stalled on a full ring use `back_off` between re-reads of the gating
//! sequences.
//!
//! | Strategy                | Latency  | CPU      |
//! |-------------------------|----------|----------|
//! | `BusySpinWaitStrategy`  | lowest   | highest  |
//! | `YieldingWaitStrategy`  | low      | high     |
//! | `SleepingWaitStrategy`  | moderate | low      |
//! | `BlockingWaitStrategy`  | highest  | lowest   |

use std::sync::atomic::{ fence, AtomicBool, AtomicUsize, Ordering };
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{ Condvar, Mutex };

use crate::constants::{
    BLOCKING_PARK_TIMEOUT_MICROS,
    DEFAULT_MAX_SLEEP_NANOS,
    DEFAULT_MIN_SLEEP_NANOS,
    DEFAULT_SLEEP_SPIN_TRIES,
    DEFAULT_SLEEP_YIELD_TRIES,
    DEFAULT_YIELD_SPIN_TRIES,
};
use crate::disruptor::sequence::{ minimum_sequence, Sequence };
use crate::error::{ Result, SequencerError };

/// Policy for waiting on a sequence.
pub trait WaitStrategy: Send + Sync {
    /// Wait until `sequence` is available.
    ///
    /// Available means the minimum of `cursor` and every sequence in
    /// `dependents` is at least `sequence`. Returns that minimum, which may be
    /// well past `sequence`. Fails with `SequencerError::Alerted` as soon as
    /// `alerted` is seen set.
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        alerted: &AtomicBool
    ) -> Result<i64>;

    /// Wake threads parked in `wait_for`. Called after every publish and alert.
    fn signal_all_when_blocking(&self) {}

    /// One idle step. `counter` starts at zero and is owned by the caller for
    /// the duration of a single wait.
    fn back_off(&self, counter: &mut u32);
}

/// Highest sequence visible through `cursor` and all `dependents`.
#[inline]
pub(crate) fn available_sequence(cursor: &Sequence, dependents: &[Arc<Sequence>]) -> i64 {
    let cursor = cursor.get();
    if dependents.is_empty() { cursor } else { minimum_sequence(dependents, cursor).min(cursor) }
}

#[inline]
fn poll<W: WaitStrategy + ?Sized>(
    strategy: &W,
    sequence: i64,
    cursor: &Sequence,
    dependents: &[Arc<Sequence>],
    alerted: &AtomicBool
) -> Result<i64> {
    let mut counter = 0u32;
    loop {
        if alerted.load(Ordering::Acquire) {
            return Err(SequencerError::Alerted);
        }
        let available = available_sequence(cursor, dependents);
        if available >= sequence {
            return Ok(available);
        }
        strategy.back_off(&mut counter);
    }
}

#[inline]
fn spin_then_yield(counter: &mut u32, spin_tries: u32) {
    if *counter < spin_tries {
        std::hint::spin_loop();
        *counter += 1;
    } else {
        thread::yield_now();
    }
}

/// Tight re-read loop. Only sensible with dedicated cores and no contention.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        alerted: &AtomicBool
    ) -> Result<i64> {
        poll(self, sequence, cursor, dependents, alerted)
    }

    #[inline]
    fn back_off(&self, _counter: &mut u32) {
        std::hint::spin_loop();
    }
}

/// Spins `spin_tries` times, then yields the rest of the time slice on every
/// iteration.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    pub fn new() -> Self {
        Self::with_spin_tries(DEFAULT_YIELD_SPIN_TRIES)
    }

    pub fn with_spin_tries(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        alerted: &AtomicBool
    ) -> Result<i64> {
        poll(self, sequence, cursor, dependents, alerted)
    }

    #[inline]
    fn back_off(&self, counter: &mut u32) {
        spin_then_yield(counter, self.spin_tries);
    }
}

/// Spins, then yields, then sleeps with a doubling backoff capped at
/// `max_sleep`.
#[derive(Debug, Clone, Copy)]
pub struct SleepingWaitStrategy {
    spin_tries: u32,
    yield_tries: u32,
    min_sleep: Duration,
    max_sleep: Duration,
}

impl SleepingWaitStrategy {
    pub fn new() -> Self {
        Self {
            spin_tries: DEFAULT_SLEEP_SPIN_TRIES,
            yield_tries: DEFAULT_SLEEP_YIELD_TRIES,
            min_sleep: Duration::from_nanos(DEFAULT_MIN_SLEEP_NANOS),
            max_sleep: Duration::from_nanos(DEFAULT_MAX_SLEEP_NANOS),
        }
    }

    pub fn with_tries(mut self, spin_tries: u32, yield_tries: u32) -> Self {
        self.spin_tries = spin_tries;
        self.yield_tries = yield_tries;
        self
    }

    /// # Panics
    /// If `min_sleep` is zero or above `max_sleep`.
    pub fn with_sleep_bounds(mut self, min_sleep: Duration, max_sleep: Duration) -> Self {
        assert!(!min_sleep.is_zero() && min_sleep <= max_sleep, "invalid sleep bounds");
        self.min_sleep = min_sleep;
        self.max_sleep = max_sleep;
        self
    }

    /// Sleep for the n-th idle round past the spin and yield phases.
    fn sleep_for(&self, round: u32) -> Duration {
        self.min_sleep.saturating_mul(1u32 << round.min(20)).min(self.max_sleep)
    }
}

impl Default for SleepingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for SleepingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        alerted: &AtomicBool
    ) -> Result<i64> {
        poll(self, sequence, cursor, dependents, alerted)
    }

    fn back_off(&self, counter: &mut u32) {
        let spun = *counter;
        *counter = counter.saturating_add(1);
        if spun < self.spin_tries {
            std::hint::spin_loop();
        } else if spun < self.spin_tries + self.yield_tries {
            thread::yield_now();
        } else {
            thread::sleep(self.sleep_for(spun - self.spin_tries - self.yield_tries));
        }
    }
}

/// Parks waiters on a condition variable until a publish signals them.
///
/// Each park is bounded by a short timeout so a producer stalled on capacity
/// (which nobody signals) still re-reads the gating sequences. Signalling
/// only takes the lock while some thread is parked.
#[derive(Debug)]
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    condition: Condvar,
    waiters: AtomicUsize,
    park_timeout: Duration,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self {
            mutex: Mutex::new(()),
            condition: Condvar::new(),
            waiters: AtomicUsize::new(0),
            park_timeout: Duration::from_micros(BLOCKING_PARK_TIMEOUT_MICROS),
        }
    }

    /// Threads currently parked or about to park.
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Relaxed)
    }

    /// Register as a waiter. The fence pairs with the one in
    /// `signal_all_when_blocking`: either the signaller sees the waiter, or
    /// the waiter sees the value published before the signal.
    fn enter(&self) {
        self.waiters.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::SeqCst);
    }

    fn leave(&self) {
        self.waiters.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Default for BlockingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        alerted: &AtomicBool
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            self.enter();
            while cursor.get() < sequence {
                if alerted.load(Ordering::Acquire) {
                    self.leave();
                    return Err(SequencerError::Alerted);
                }
                self.condition.wait_for(&mut guard, self.park_timeout);
            }
            self.leave();
        }

        // Upstream consumers do not signal; poll them.
        let mut counter = 0u32;
        loop {
            if alerted.load(Ordering::Acquire) {
                return Err(SequencerError::Alerted);
            }
            let available = available_sequence(cursor, dependents);
            if available >= sequence {
                return Ok(available);
            }
            spin_then_yield(&mut counter, DEFAULT_YIELD_SPIN_TRIES);
        }
    }

    fn signal_all_when_blocking(&self) {
        fence(Ordering::SeqCst);
        if self.waiters.load(Ordering::Relaxed) == 0 {
            return;
        }
        let _guard = self.mutex.lock();
        self.condition.notify_all();
    }

    fn back_off(&self, _counter: &mut u32) {
        let mut guard = self.mutex.lock();
        self.enter();
        self.condition.wait_for(&mut guard, self.park_timeout);
        self.leave();
    }
}

/// Wait strategy selection knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategyOption {
    BusySpin,
    Yielding,
    Sleeping,
    #[default]
    Blocking,
}

/// Closed set of wait strategies, dispatched by tag.
#[derive(Debug)]
pub enum AnyWaitStrategy {
    BusySpin(BusySpinWaitStrategy),
    Yielding(YieldingWaitStrategy),
    Sleeping(SleepingWaitStrategy),
    Blocking(BlockingWaitStrategy),
}

impl From<WaitStrategyOption> for AnyWaitStrategy {
    fn from(option: WaitStrategyOption) -> Self {
        match option {
            WaitStrategyOption::BusySpin => Self::BusySpin(BusySpinWaitStrategy::new()),
            WaitStrategyOption::Yielding => Self::Yielding(YieldingWaitStrategy::new()),
            WaitStrategyOption::Sleeping => Self::Sleeping(SleepingWaitStrategy::new()),
            WaitStrategyOption::Blocking => Self::Blocking(BlockingWaitStrategy::new()),
        }
    }
}

impl WaitStrategy for AnyWaitStrategy {
    #[inline]
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        alerted: &AtomicBool
    ) -> Result<i64> {
        match self {
            Self::BusySpin(s) => s.wait_for(sequence, cursor, dependents, alerted),
            Self::Yielding(s) => s.wait_for(sequence, cursor, dependents, alerted),
            Self::Sleeping(s) => s.wait_for(sequence, cursor, dependents, alerted),
            Self::Blocking(s) => s.wait_for(sequence, cursor, dependents, alerted),
        }
    }

    #[inline]
    fn signal_all_when_blocking(&self) {
        if let Self::Blocking(s) = self {
            s.signal_all_when_blocking();
        }
    }

    #[inline]
    fn back_off(&self, counter: &mut u32) {
        match self {
            Self::BusySpin(s) => s.back_off(counter),
            Self::Yielding(s) => s.back_off(counter),
            Self::Sleeping(s) => s.back_off(counter),
            Self::Blocking(s) => s.back_off(counter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn all_strategies() -> Vec<AnyWaitStrategy> {
        [
            WaitStrategyOption::BusySpin,
            WaitStrategyOption::Yielding,
            WaitStrategyOption::Sleeping,
            WaitStrategyOption::Blocking,
        ]
        .into_iter()
        .map(AnyWaitStrategy::from)
        .collect()
    }

    #[test]
    fn test_returns_immediately_when_available() {
        let cursor = Sequence::new(5);
        let alerted = AtomicBool::new(false);
        for strategy in all_strategies() {
            assert_eq!(strategy.wait_for(3, &cursor, &[], &alerted), Ok(5));
        }
    }

    #[test]
    fn test_gated_by_slowest_dependent() {
        let cursor = Sequence::new(10);
        let dependents = vec![Arc::new(Sequence::new(7)), Arc::new(Sequence::new(8))];
        let alerted = AtomicBool::new(false);
        for strategy in all_strategies() {
            assert_eq!(strategy.wait_for(6, &cursor, &dependents, &alerted), Ok(7));
        }
    }

    #[test]
    fn test_alert_before_wait() {
        let cursor = Sequence::default();
        let alerted = AtomicBool::new(true);
        for strategy in all_strategies() {
            assert_eq!(strategy.wait_for(0, &cursor, &[], &alerted), Err(SequencerError::Alerted));
        }
    }

    #[test]
    fn test_wakes_on_cursor_advance() {
        for strategy in all_strategies() {
            let strategy = Arc::new(strategy);
            let cursor = Arc::new(Sequence::default());
            let alerted = Arc::new(AtomicBool::new(false));

            let (s, c, a) = (strategy.clone(), cursor.clone(), alerted.clone());
            let waiter = thread::spawn(move || s.wait_for(2, &c, &[], &a));

            thread::sleep(Duration::from_millis(10));
            cursor.set(3);
            strategy.signal_all_when_blocking();

            assert_eq!(waiter.join().unwrap(), Ok(3));
        }
    }

    #[test]
    fn test_alert_during_wait() {
        for strategy in all_strategies() {
            let strategy = Arc::new(strategy);
            let cursor = Arc::new(Sequence::default());
            let alerted = Arc::new(AtomicBool::new(false));

            let (s, c, a) = (strategy.clone(), cursor.clone(), alerted.clone());
            let waiter = thread::spawn(move || s.wait_for(0, &c, &[], &a));

            thread::sleep(Duration::from_millis(10));
            alerted.store(true, Ordering::Release);
            strategy.signal_all_when_blocking();

            assert_eq!(waiter.join().unwrap(), Err(SequencerError::Alerted));
        }
    }

    #[test]
    fn test_blocking_signal_skips_lock_without_waiters() {
        let strategy = BlockingWaitStrategy::new();
        let _held = strategy.mutex.lock();
        // Would deadlock if the signal took the lock
        strategy.signal_all_when_blocking();
        assert_eq!(strategy.waiters(), 0);
    }

    #[test]
    fn test_blocking_waiter_count_tracks_parked_threads() {
        let strategy = Arc::new(BlockingWaitStrategy::new());
        let cursor = Arc::new(Sequence::default());
        let alerted = Arc::new(AtomicBool::new(false));

        let (s, c, a) = (strategy.clone(), cursor.clone(), alerted.clone());
        let waiter = thread::spawn(move || s.wait_for(0, &c, &[], &a));

        let start = Instant::now();
        while strategy.waiters() == 0 {
            assert!(start.elapsed() < Duration::from_secs(5), "waiter never parked");
            thread::yield_now();
        }

        cursor.set(0);
        strategy.signal_all_when_blocking();
        assert_eq!(waiter.join().unwrap(), Ok(0));
        assert_eq!(strategy.waiters(), 0);

        alerted.store(true, Ordering::Release);
        assert_eq!(strategy.wait_for(1, &cursor, &[], &alerted), Err(SequencerError::Alerted));
        assert_eq!(strategy.waiters(), 0);
    }

    #[test]
    fn test_sleep_backoff_is_capped() {
        let strategy = SleepingWaitStrategy::new()
            .with_tries(0, 0)
            .with_sleep_bounds(Duration::from_micros(1), Duration::from_micros(50));
        assert_eq!(strategy.sleep_for(0), Duration::from_micros(1));
        assert_eq!(strategy.sleep_for(3), Duration::from_micros(8));
        assert_eq!(strategy.sleep_for(30), Duration::from_micros(50));
    }

    #[test]
    fn test_sleeping_back_off_advances_counter() {
        let strategy = SleepingWaitStrategy::new()
            .with_tries(1, 1)
            .with_sleep_bounds(Duration::from_micros(1), Duration::from_micros(10));
        let mut counter = 0;
        let start = Instant::now();
        for _ in 0..5 {
            strategy.back_off(&mut counter);
        }
        assert_eq!(counter, 5);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
