//! Bounded uniform integers over a single shared generator.
//!
//! Every stochastic decision in the workload (list sizes, partition counts,
//! list contents, sleep and cache draws) goes through [`uniform`]. A run uses
//! one [`SharedRng`] so the statistics of a run are representative; passing a
//! seed makes a run reproducible for tests.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};

/// Returns an integer in `[min, max]` inclusive.
///
/// Fails with [`Error::InvalidArgument`] unless `max > 0` and `min <= max`.
/// When `min == max` the generator is not touched.
pub fn uniform<R: Rng + ?Sized>(min: i64, max: i64, rng: &mut R) -> Result<i64> {
    if max <= 0 {
        return Err(Error::invalid_argument(format!(
            "max must be positive (min: {min}, max: {max})"
        )));
    }
    if min > max {
        return Err(Error::invalid_argument(format!(
            "min must be less than or equal to max (min: {min}, max: {max})"
        )));
    }
    if min == max {
        return Ok(min);
    }
    Ok(rng.gen_range(min..=max))
}

/// Returns a percentage draw, an integer in `[1, 100]`.
pub fn percentage<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    // Constant bounds always satisfy the preconditions.
    rng.gen_range(1..=100)
}

/// Cloneable handle to the process-wide generator.
#[derive(Clone, Debug)]
pub struct SharedRng {
    inner: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    /// Creates a generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Creates a reproducible generator.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Seeded when `seed` is given, from entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }

    /// See [`uniform`].
    pub fn uniform(&self, min: i64, max: i64) -> Result<i64> {
        uniform(min, max, &mut *self.inner.lock())
    }

    /// See [`percentage`].
    pub fn percentage(&self) -> i64 {
        percentage(&mut *self.inner.lock())
    }

    /// Generates `len` values, each uniform in `[0, i32::MAX - 1]`.
    ///
    /// Holds the lock once for the whole list rather than once per element.
    pub fn fill_list(&self, len: usize) -> Vec<i32> {
        let mut rng = self.inner.lock();
        (0..len).map(|_| rng.gen_range(0..i32::MAX)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    /// Counts how often the wrapped generator is asked for bits.
    struct CountingRng {
        inner: StdRng,
        calls: usize,
    }

    impl CountingRng {
        fn new() -> Self {
            Self {
                inner: StdRng::seed_from_u64(7),
                calls: 0,
            }
        }
    }

    impl RngCore for CountingRng {
        fn next_u32(&mut self) -> u32 {
            self.calls += 1;
            self.inner.next_u32()
        }

        fn next_u64(&mut self) -> u64 {
            self.calls += 1;
            self.inner.next_u64()
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            self.calls += 1;
            self.inner.fill_bytes(dest)
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> core::result::Result<(), rand::Error> {
            self.calls += 1;
            self.inner.try_fill_bytes(dest)
        }
    }

    #[test]
    fn test_degenerate_range_does_not_consume() {
        let mut rng = CountingRng::new();
        for _ in 0..100 {
            assert_eq!(uniform(5, 5, &mut rng), Ok(5));
        }
        assert_eq!(rng.calls, 0);
    }

    #[test]
    fn test_non_degenerate_range_consumes() {
        let mut rng = CountingRng::new();
        uniform(1, 10, &mut rng).unwrap();
        assert!(rng.calls > 0);
    }

    #[test]
    fn test_covers_full_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 11];
        for _ in 0..10_000 {
            let v = uniform(0, 10, &mut rng).unwrap();
            assert!((0..=10).contains(&v));
            seen[v as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_rejects_invalid_ranges() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            uniform(0, 0, &mut rng),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            uniform(-5, -1, &mut rng),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            uniform(10, 3, &mut rng),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_percentage_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        for _ in 0..10_000 {
            let p = percentage(&mut rng);
            min = min.min(p);
            max = max.max(p);
        }
        assert_eq!((min, max), (1, 100));
    }

    #[test]
    fn test_seeded_shared_rng_is_reproducible() {
        let a = SharedRng::seeded(99);
        let b = SharedRng::seeded(99);
        assert_eq!(a.fill_list(64), b.fill_list(64));
        assert_eq!(a.uniform(1, 1000), b.uniform(1, 1000));
    }

    #[test]
    fn test_fill_list_values_in_range() {
        let rng = SharedRng::seeded(5);
        let list = rng.fill_list(1000);
        assert_eq!(list.len(), 1000);
        assert!(list.iter().all(|&v| (0..i32::MAX).contains(&v)));
    }

    #[test]
    fn test_clones_share_one_stream() {
        let a = SharedRng::seeded(11);
        let b = a.clone();
        let reference = SharedRng::seeded(11);
        let first = a.uniform(1, 1_000_000).unwrap();
        let second = b.uniform(1, 1_000_000).unwrap();
        assert_eq!(first, reference.uniform(1, 1_000_000).unwrap());
        assert_eq!(second, reference.uniform(1, 1_000_000).unwrap());
    }
}
