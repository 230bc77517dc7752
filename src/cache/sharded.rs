//! Map-backed retention pool with lock striping.
//!
//! Slots are spread across independent segments, each a small map behind its
//! own lock, so writers touching different slots rarely contend.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      ShardedCache                        │
//! │                                                          │
//! │  index % N  ──▶  Segment Selection                       │
//! │                                                          │
//! │  ┌────────────┐ ┌────────────┐     ┌────────────┐        │
//! │  │ Segment 0  │ │ Segment 1  │ ... │ Segment N-1│        │
//! │  │  [Mutex]   │ │  [Mutex]   │     │  [Mutex]   │        │
//! │  │  HashMap   │ │  HashMap   │     │  HashMap   │        │
//! │  └────────────┘ └────────────┘     └────────────┘        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike [`BoundedCache`](super::BoundedCache) there is no filling phase:
//! every `put` lands on the slot it names, and slots outside
//! `[0, capacity)` are rejected, which is what keeps the pool bounded.

use parking_lot::Mutex;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

use super::Cache;
use crate::error::{Error, Result};

/// Default number of segments.
pub const DEFAULT_SEGMENT_COUNT: usize = 16;

/// A fixed-capacity pool keyed by slot index and striped across segments.
#[derive(Debug)]
pub struct ShardedCache<T> {
    capacity: usize,
    segments: Box<[Mutex<HashMap<usize, T>>]>,
}

impl<T> ShardedCache<T> {
    /// Creates a pool with [`DEFAULT_SEGMENT_COUNT`] segments.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_segments(capacity, DEFAULT_SEGMENT_COUNT)
    }

    /// Creates a pool with an explicit segment count.
    ///
    /// The segment count is clamped to the capacity so no segment is
    /// permanently empty.
    pub fn with_segments(capacity: usize, segments: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument("cache capacity must be positive"));
        }
        if segments == 0 {
            return Err(Error::invalid_argument("segment count must be positive"));
        }
        let segment_count = segments.min(capacity);
        let per_segment = capacity.div_ceil(segment_count);
        let segments: Vec<_> = (0..segment_count)
            .map(|_| Mutex::new(HashMap::with_capacity(per_segment)))
            .collect();
        Ok(Self {
            capacity,
            segments: segments.into_boxed_slice(),
        })
    }

    /// Number of lock segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    fn segment(&self, index: usize) -> &Mutex<HashMap<usize, T>> {
        &self.segments[index % self.segments.len()]
    }
}

impl<T> Cache<T> for ShardedCache<T>
where
    T: Clone + Send,
{
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.segments.iter().map(|s| s.lock().len()).sum()
    }

    fn put(&self, index: usize, value: T) -> Result<()> {
        if index >= self.capacity {
            return Err(Error::OutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        self.segment(index).lock().insert(index, value);
        Ok(())
    }

    fn get(&self, index: usize) -> Result<Option<T>> {
        Ok(self.segment(index).lock().get(&index).cloned())
    }
}
