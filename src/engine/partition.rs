//! Contiguous partitioning of a work list.
//!
//! A list of length `L` split `P` ways yields chunks of `L / P` elements,
//! walked strictly in index order; the final chunk absorbs the remainder.
//! The ranges are half-open, non-overlapping and cover `[0, L)` exactly once.
//!
//! ```text
//! L = 10, P = 3   chunk = 3
//!
//!   index:  0 1 2 | 3 4 5 | 6 7 8 9
//!           ──────  ──────  ───────
//!           0..3    3..6    6..10   ◀── last partition absorbs the remainder
//! ```

use std::ops::Range;

/// Iterator over the partitions of a list.
#[derive(Debug, Clone)]
pub struct Partitioner {
    len: usize,
    chunk: usize,
    partitions: usize,
    max_partitions: usize,
    partition_min: usize,
    partition_max: usize,
    partitions_done: usize,
}

impl Partitioner {
    /// Splits `len` elements into `partitions` chunks, never producing more
    /// than `max_partitions` of them.
    ///
    /// When `partitions` exceeds `len` every element becomes its own
    /// partition. A `partitions` or `max_partitions` of zero is treated as one.
    pub fn new(len: usize, partitions: usize, max_partitions: usize) -> Self {
        let partitions = partitions.max(1);
        Self {
            len,
            chunk: (len / partitions).max(1),
            partitions,
            max_partitions: max_partitions.max(1),
            partition_min: 0,
            partition_max: 0,
            partitions_done: 0,
        }
    }

    /// First index of the most recently produced partition.
    pub fn partition_min(&self) -> usize {
        self.partition_min
    }

    /// One past the last index of the most recently produced partition.
    pub fn partition_max(&self) -> usize {
        self.partition_max
    }

    /// Partitions produced so far.
    pub fn partitions_done(&self) -> usize {
        self.partitions_done
    }

    /// Whether every element has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.partition_max >= self.len
    }
}

impl Iterator for Partitioner {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        let start = self.partition_max;
        if start >= self.len {
            return None;
        }
        let produced = self.partitions_done + 1;
        let end = if produced >= self.partitions || produced >= self.max_partitions {
            self.len
        } else {
            (start + self.chunk).min(self.len)
        };

        self.partition_min = start;
        self.partition_max = end;
        self.partitions_done = produced;
        Some(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(len: usize, partitions: usize, max: usize) -> Vec<Range<usize>> {
        Partitioner::new(len, partitions, max).collect()
    }

    #[test]
    fn test_even_split() {
        assert_eq!(collect(9, 3, 10), vec![0..3, 3..6, 6..9]);
    }

    #[test]
    fn test_remainder_goes_to_last() {
        assert_eq!(collect(10, 3, 10), vec![0..3, 3..6, 6..10]);
        assert_eq!(collect(11, 4, 10), vec![0..2, 2..4, 4..6, 6..11]);
    }

    #[test]
    fn test_single_partition() {
        assert_eq!(collect(5, 1, 1), vec![0..5]);
    }

    #[test]
    fn test_more_partitions_than_elements() {
        assert_eq!(collect(3, 10, 10), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn test_max_partitions_guard() {
        assert_eq!(collect(100, 50, 3), vec![0..2, 2..4, 4..100]);
    }

    #[test]
    fn test_empty_list() {
        assert!(collect(0, 4, 4).is_empty());
        assert!(Partitioner::new(0, 4, 4).is_exhausted());
    }

    #[test]
    fn test_cursors_track_progress() {
        let mut p = Partitioner::new(10, 2, 10);
        assert_eq!(p.next(), Some(0..5));
        assert_eq!((p.partition_min(), p.partition_max()), (0, 5));
        assert!(!p.is_exhausted());
        assert_eq!(p.next(), Some(5..10));
        assert_eq!(p.partitions_done(), 2);
        assert!(p.is_exhausted());
        assert_eq!(p.next(), None);
        assert_eq!(p.partitions_done(), 2);
    }

    #[test]
    fn test_exact_cover_exhaustive_small() {
        for len in 1..60 {
            for partitions in 1..=len {
                let ranges = collect(len, partitions, 1000);
                assert_eq!(ranges.len(), partitions, "len {len} partitions {partitions}");
                let mut next = 0;
                for r in &ranges {
                    assert_eq!(r.start, next);
                    assert!(r.end > r.start);
                    next = r.end;
                }
                assert_eq!(next, len);
            }
        }
    }
}
