//! Batch claims.

use crate::constants::INITIAL_CURSOR_VALUE;

/// A contiguous run of sequence numbers claimed and published as one unit.
///
/// Filled by `Sequencer::next_batch` and handed back to
/// `Sequencer::publish_batch`. Always `start() == end() - size() + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDescriptor {
    size: i64,
    end: i64,
}

impl BatchDescriptor {
    /// # Panics
    /// If `size` is not positive.
    pub fn new(size: i64) -> Self {
        assert!(size > 0, "batch size must be positive, got {size}");
        Self { size, end: INITIAL_CURSOR_VALUE }
    }

    #[inline]
    pub fn size(&self) -> i64 {
        self.size
    }

    #[inline]
    pub fn end(&self) -> i64 {
        self.end
    }

    #[inline]
    pub fn start(&self) -> i64 {
        self.end - self.size + 1
    }

    #[inline]
    pub(crate) fn set_end(&mut self, end: i64) {
        self.end = end;
    }

    /// Sequence numbers covered by this batch, lowest first
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        self.start()..=self.end
    }
}
