//! Bounded row history for the live table.
//!
//! Keeps the newest `capacity` rows of a run that may persist thousands of
//! samples. Older rows are still in the durable record; the live view only
//! needs enough to fill the screen and scroll back a little.

use std::collections::VecDeque;

/// A fixed-capacity ring buffer.
///
/// Pushing into a full buffer discards the oldest value.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
    pushed: u64,
}

impl<T> RingBuffer<T> {
    /// Creates a new ring buffer with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring buffer capacity must be greater than 0");
        Self { data: VecDeque::with_capacity(capacity), capacity, pushed: 0 }
    }

    /// Pushes a value, discarding the oldest one if the buffer is full.
    pub fn push(&mut self, value: T) {
        if self.data.len() >= self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value);
        self.pushed += 1;
    }

    /// Returns the current number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total number of values ever pushed, including discarded ones.
    #[must_use]
    pub fn total_pushed(&self) -> u64 {
        self.pushed
    }

    /// Iterates over the newest `n` values, oldest first.
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &T> {
        self.data.iter().skip(self.data.len().saturating_sub(n))
    }
}
