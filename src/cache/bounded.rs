//! Hard-reference retention pool.
//!
//! Values are kept in a single vector behind one lock. While the pool is
//! filling, every `put` appends regardless of the index it was handed; once
//! full, `put` replaces the addressed slot. The result is a pool that mimics
//! an application's cache churn without being a real keyed store.

use parking_lot::Mutex;

use super::Cache;
use crate::error::{Error, Result};

/// A fixed-capacity pool of hard references.
///
/// # Example
///
/// ```
/// use workhorse::cache::{BoundedCache, Cache};
///
/// let cache = BoundedCache::new(3).unwrap();
/// cache.put(0, "a").unwrap();
/// cache.put(0, "b").unwrap(); // still filling: appended
/// assert_eq!(cache.get(1).unwrap(), Some("b"));
/// ```
#[derive(Debug)]
pub struct BoundedCache<T> {
    capacity: usize,
    slots: Mutex<Vec<T>>,
}

impl<T> BoundedCache<T> {
    /// Creates an empty pool; fails with [`Error::InvalidArgument`] for a zero capacity.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::invalid_argument("cache capacity must be positive"));
        }
        Ok(Self {
            capacity,
            slots: Mutex::new(Vec::with_capacity(capacity)),
        })
    }
}

impl<T> Cache<T> for BoundedCache<T>
where
    T: Clone + Send,
{
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.slots.lock().len()
    }

    fn put(&self, index: usize, value: T) -> Result<()> {
        let mut slots = self.slots.lock();
        if slots.len() < self.capacity {
            slots.push(value);
            return Ok(());
        }
        match slots.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::OutOfRange {
                index,
                capacity: self.capacity,
            }),
        }
    }

    fn get(&self, index: usize) -> Result<Option<T>> {
        Ok(self.slots.lock().get(index).cloned())
    }
}
