//! Consumer-side sequence barrier.

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

use crate::disruptor::sequence::Sequence;
use crate::disruptor::wait_strategy::WaitStrategy;
use crate::error::{ Result, SequencerError };
use crate::insights::record_alert;
use crate::metrics::Metrics;

/// Resolves the highest sequence a consumer may read.
///
/// Gated by the sequencer's cursor and, for chained stages, by the progress of
/// every upstream consumer in `dependents`. Created by
/// `Sequencer::new_barrier`; the barrier only ever reads the cursor.
pub struct SequenceBarrier<W: WaitStrategy> {
    cursor: Arc<Sequence>,
    dependents: Vec<Arc<Sequence>>,
    wait_strategy: Arc<W>,
    alerted: AtomicBool,
    metrics: Arc<Metrics>,
}

impl<W: WaitStrategy> SequenceBarrier<W> {
    pub(crate) fn new(
        cursor: Arc<Sequence>,
        dependents: Vec<Arc<Sequence>>,
        wait_strategy: Arc<W>,
        metrics: Arc<Metrics>
    ) -> Self {
        Self {
            cursor,
            dependents,
            wait_strategy,
            alerted: AtomicBool::new(false),
            metrics,
        }
    }

    /// Block until `sequence` is available and return the highest available
    /// sequence, which may be past `sequence` when more has been published.
    ///
    /// # Errors
    /// `SequencerError::Alerted` if the barrier is alerted before or while
    /// waiting.
    pub fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;
        self.wait_strategy.wait_for(sequence, &self.cursor, &self.dependents, &self.alerted)
    }

    /// Current cursor value, without waiting.
    #[inline]
    pub fn cursor(&self) -> i64 {
        self.cursor.get()
    }

    pub fn dependents(&self) -> &[Arc<Sequence>] {
        &self.dependents
    }

    #[inline]
    pub fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    /// Abort current and future waits until `clear_alert`.
    pub fn alert(&self) {
        self.alerted.store(true, Ordering::Release);
        self.metrics.record_alert();
        record_alert(self.cursor.get());
        self.wait_strategy.signal_all_when_blocking();
    }

    pub fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }

    pub fn check_alert(&self) -> Result<()> {
        if self.is_alerted() { Err(SequencerError::Alerted) } else { Ok(()) }
    }
}

impl<W: WaitStrategy> std::fmt::Debug for SequenceBarrier<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceBarrier")
            .field("cursor", &self.cursor)
            .field("dependents", &self.dependents)
            .field("alerted", &self.is_alerted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::wait_strategy::{ BlockingWaitStrategy, YieldingWaitStrategy };
    use std::thread;
    use std::time::Duration;

    fn barrier_with<W: WaitStrategy>(cursor: &Arc<Sequence>, dependents: Vec<Arc<Sequence>>, wait: W) -> SequenceBarrier<W> {
        SequenceBarrier::new(cursor.clone(), dependents, Arc::new(wait), Arc::new(Metrics::new()))
    }

    #[test]
    fn test_wait_returns_highest_available() {
        let cursor = Arc::new(Sequence::new(6));
        let barrier = barrier_with(&cursor, Vec::new(), YieldingWaitStrategy::new());
        assert_eq!(barrier.wait_for(2), Ok(6));
        assert_eq!(barrier.cursor(), 6);
    }

    #[test]
    fn test_dependents_hold_back_downstream() {
        let cursor = Arc::new(Sequence::new(9));
        let upstream = Arc::new(Sequence::new(3));
        let barrier = Arc::new(barrier_with(&cursor, vec![upstream.clone()], YieldingWaitStrategy::new()));

        assert_eq!(barrier.wait_for(3), Ok(3));

        let b = barrier.clone();
        let waiter = thread::spawn(move || b.wait_for(5));
        thread::sleep(Duration::from_millis(10));
        upstream.set(7);
        assert_eq!(waiter.join().unwrap(), Ok(7));
    }

    #[test]
    fn test_alert_lifecycle() {
        let cursor = Arc::new(Sequence::new(0));
        let barrier = barrier_with(&cursor, Vec::new(), YieldingWaitStrategy::new());

        assert!(!barrier.is_alerted());
        barrier.alert();
        assert!(barrier.is_alerted());
        assert_eq!(barrier.check_alert(), Err(SequencerError::Alerted));
        assert_eq!(barrier.wait_for(0), Err(SequencerError::Alerted));

        barrier.clear_alert();
        assert!(barrier.check_alert().is_ok());
        assert_eq!(barrier.wait_for(0), Ok(0));
        assert_eq!(barrier.metrics.snapshot().alerts, 1);
    }

    #[test]
    fn test_alert_wakes_blocked_waiter() {
        let cursor = Arc::new(Sequence::default());
        let barrier = Arc::new(barrier_with(&cursor, Vec::new(), BlockingWaitStrategy::new()));

        let b = barrier.clone();
        let waiter = thread::spawn(move || b.wait_for(0));
        thread::sleep(Duration::from_millis(20));
        barrier.alert();

        assert_eq!(waiter.join().unwrap(), Err(SequencerError::Alerted));
    }
}
