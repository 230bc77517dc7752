//! Map-backed retention pool with a configurable eviction policy.
//!
//! Slots are keys of a [`moka::sync::Cache`]. Unlike the other pools, an
//! entry that was stored does not have to stay: the [`MapRetention`] policy
//! decides how many entries survive and for how long.
//!
//! ```text
//! put(index) ──▶ index < capacity? ──▶ moka::sync::Cache<usize, T>
//!                                        │
//!                                        ├─ max_entries   size-based eviction (TinyLFU)
//!                                        ├─ time_to_live  expire after write
//!                                        └─ time_to_idle  expire after last read
//! ```

use std::fmt;
use std::time::Duration;

use moka::sync::Cache as MokaCache;

use super::Cache;
use crate::error::{Error, Result};

/// How long, and how many, entries a [`MapCache`] keeps.
///
/// Every field is optional; with all of them `None` the pool behaves like a
/// plain slot map bounded only by its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapRetention {
    /// Entries kept before older or colder ones are evicted. Clamped to the capacity.
    pub max_entries: Option<u64>,
    /// Entries expire this long after they were written.
    pub time_to_live: Option<Duration>,
    /// Entries expire this long after they were last read or written.
    pub time_to_idle: Option<Duration>,
}

impl MapRetention {
    /// Rejects limits that would make the pool retain nothing.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == Some(0) {
            return Err(Error::invalid_argument("map max_entries must be positive"));
        }
        if self.time_to_live == Some(Duration::ZERO) {
            return Err(Error::invalid_argument("map time_to_live must be positive"));
        }
        if self.time_to_idle == Some(Duration::ZERO) {
            return Err(Error::invalid_argument("map time_to_idle must be positive"));
        }
        Ok(())
    }
}

/// A slot-keyed pool whose entries may be evicted or expire.
pub struct MapCache<T> {
    capacity: usize,
    retention: MapRetention,
    inner: MokaCache<usize, T>,
}

impl<T> MapCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a pool with `capacity` addressable slots and no eviction beyond it.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_retention(capacity, MapRetention::default())
    }

    /// Creates a pool that applies `retention` on top of the slot bound.
    pub fn with_retention(capacity: usize, retention: MapRetention) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument("cache capacity must be positive"));
        }
        retention.validate()?;

        let max_entries = retention
            .max_entries
            .map_or(capacity as u64, |max| max.min(capacity as u64));
        let mut builder = MokaCache::builder()
            .max_capacity(max_entries)
            .initial_capacity(capacity);
        if let Some(ttl) = retention.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = retention.time_to_idle {
            builder = builder.time_to_idle(tti);
        }
        Ok(Self {
            capacity,
            retention,
            inner: builder.build(),
        })
    }

    /// The policy this pool was built with.
    pub fn retention(&self) -> MapRetention {
        self.retention
    }
}

impl<T> Cache<T> for MapCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        // entry_count lags until pending evictions are applied
        self.inner.run_pending_tasks();
        usize::try_from(self.inner.entry_count()).unwrap_or(self.capacity)
    }

    fn put(&self, index: usize, value: T) -> Result<()> {
        if index >= self.capacity {
            return Err(Error::OutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        self.inner.insert(index, value);
        Ok(())
    }

    fn get(&self, index: usize) -> Result<Option<T>> {
        Ok(self.inner.get(&index))
    }
}

impl<T> fmt::Debug for MapCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapCache")
            .field("capacity", &self.capacity)
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}
