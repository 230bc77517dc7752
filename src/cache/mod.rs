//! Retention pools for finished work.
//!
//! Real servers keep some of their results around: hard-referenced arrays,
//! bounded maps, layered stores. The workload models that with a single
//! capability, [`Cache`], addressed by slot index, and interchangeable
//! implementations chosen at construction.
//!
//! | Type | Backing | Put semantics |
//! |------|---------|---------------|
//! | [`BoundedCache`] | one `Mutex<Vec<T>>` | append while filling, overwrite slot once full |
//! | [`ShardedCache`] | `N` `Mutex<HashMap<usize, T>>` segments | always addresses the slot |
//! | [`MapCache`] | `moka::sync::Cache<usize, T>` | addresses the slot, may evict or expire it |
//!
//! No implementation offers an atomic read-modify-write across a
//! [`Cache::get`] followed by a [`Cache::put`]. Readers may observe a value
//! that a concurrent writer is about to replace.

mod bounded;
mod map;
mod sharded;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub use self::bounded::BoundedCache;
pub use self::map::{MapCache, MapRetention};
pub use self::sharded::ShardedCache;

use crate::config::PoolSettings;
use crate::error::{Error, Result};

/// A fixed-capacity, thread-safe container addressed by slot index.
pub trait Cache<T>: Send + Sync {
    /// The fixed capacity chosen at construction.
    fn capacity(&self) -> usize;

    /// Number of occupied slots. Never exceeds [`Cache::capacity`].
    fn len(&self) -> usize;

    /// Whether no slot is occupied.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `value` at (or, while filling, on behalf of) slot `index`.
    fn put(&self, index: usize, value: T) -> Result<()>;

    /// Reads slot `index`; `Ok(None)` when nothing is stored there.
    fn get(&self, index: usize) -> Result<Option<T>>;
}

/// Which [`Cache`] implementation backs the hot and cold pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    /// [`BoundedCache`]
    #[default]
    Bounded,
    /// [`ShardedCache`]
    Sharded,
    /// [`MapCache`]
    Map,
}

impl CacheKind {
    /// Lower-case name used on the command line and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::Bounded => "bounded",
            CacheKind::Sharded => "sharded",
            CacheKind::Map => "map",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bounded" => Ok(CacheKind::Bounded),
            "sharded" => Ok(CacheKind::Sharded),
            "map" => Ok(CacheKind::Map),
            other => Err(Error::invalid_argument(format!(
                "unknown cache kind '{other}', expected 'bounded', 'sharded' or 'map'"
            ))),
        }
    }
}

/// Builds a shared cache of `capacity` slots as `pool.cache_kind` describes.
///
/// `pool.cache_segments` only matters for [`CacheKind::Sharded`], and
/// `pool.map_retention` only for [`CacheKind::Map`].
pub fn build_cache<T>(pool: &PoolSettings, capacity: usize) -> Result<Arc<dyn Cache<T>>>
where
    T: Clone + Send + Sync + 'static,
{
    Ok(match pool.cache_kind {
        CacheKind::Bounded => Arc::new(BoundedCache::new(capacity)?),
        CacheKind::Sharded => {
            Arc::new(ShardedCache::with_segments(capacity, pool.cache_segments)?)
        }
        CacheKind::Map => Arc::new(MapCache::with_retention(capacity, pool.map_retention)?),
    })
}
