//! Lazy walker over run-length encoded synapse interval lists
//!
//! Everything the compile and solve layers know about a neuron's inputs and
//! weights they learn by walking interval lists through this type. The
//! iterator borrows the list, walks `starts, starts±1, …` over each
//! interval's `interval_size` elements, and is freely restartable.

use crate::synapse::SynapseInterval;

/// Borrowing walker over a list of synapse intervals
#[derive(Debug, Clone, Copy)]
pub struct SynapseIterator<'a, T: SynapseInterval> {
    intervals: &'a [T],
}

impl<'a, T: SynapseInterval> SynapseIterator<'a, T> {
    /// Wrap an interval list for walking
    pub fn new(intervals: &'a [T]) -> Self {
        Self { intervals }
    }

    /// The underlying interval list
    pub fn intervals(&self) -> &'a [T] {
        self.intervals
    }

    /// Number of intervals in the list
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Total number of logical indices covered by the list
    pub fn size(&self) -> u32 {
        self.intervals.iter().map(|s| s.interval_size()).sum()
    }

    /// Last logical index of the list, or `None` when the list is empty.
    ///
    /// Calling this on an empty list is a caller error in every use the
    /// compiler makes of it; the `Option` is the signal.
    pub fn back(&self) -> Option<i32> {
        self.intervals.last().and_then(|s| s.last_index())
    }

    /// Last interval of the list
    pub fn last_interval(&self) -> Option<&'a T> {
        self.intervals.last()
    }

    /// The `n`-th logical index of the list, counted across intervals
    pub fn fetch(&self, n: u32) -> Option<i32> {
        let mut remaining = n;
        for interval in self.intervals {
            if remaining < interval.interval_size() {
                return Some(interval.nth_index(remaining));
            }
            remaining -= interval.interval_size();
        }
        None
    }

    /// Visit every interval, then every logical index of that interval
    pub fn iterate<S, F>(&self, mut per_interval: S, mut per_index: F)
    where
        S: FnMut(&T),
        F: FnMut(&T, i32),
    {
        for interval in self.intervals {
            per_interval(interval);
            for n in 0..interval.interval_size() {
                per_index(interval, interval.nth_index(n));
            }
        }
    }

    /// Visit every logical index of the list
    pub fn iterate_indices<F>(&self, mut per_index: F)
    where
        F: FnMut(&T, i32),
    {
        self.iterate(|_| {}, |interval, index| per_index(interval, index));
    }

    /// Visit the logical indices of `interval_count` intervals starting at
    /// interval `first_interval`
    pub fn iterate_range<F>(&self, mut per_index: F, first_interval: usize, interval_count: usize)
    where
        F: FnMut(&T, i32),
    {
        let end = (first_interval + interval_count).min(self.intervals.len());
        for interval in &self.intervals[first_interval..end] {
            for n in 0..interval.interval_size() {
                per_index(interval, interval.nth_index(n));
            }
        }
    }

    /// Visit every interval without expanding logical indices
    pub fn skim<S>(&self, mut per_interval: S)
    where
        S: FnMut(&T),
    {
        for interval in self.intervals {
            per_interval(interval);
        }
    }

    /// Visit intervals until the callback returns `false`
    pub fn skim_terminatable<S>(&self, mut per_interval: S)
    where
        S: FnMut(&T) -> bool,
    {
        for interval in self.intervals {
            if !per_interval(interval) {
                return;
            }
        }
    }

    /// Visit logical indices until the callback returns `false`
    pub fn iterate_terminatable<F>(&self, mut per_index: F)
    where
        F: FnMut(&T, i32) -> bool,
    {
        for interval in self.intervals {
            for n in 0..interval.interval_size() {
                if !per_index(interval, interval.nth_index(n)) {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synapse::{encode_input_index, InputSynapseInterval};
    use proptest::prelude::*;

    fn intervals() -> Vec<InputSynapseInterval> {
        vec![
            InputSynapseInterval::new(2, 3),                     // 2,3,4
            InputSynapseInterval::new(encode_input_index(0), 2), // -1,-2
            InputSynapseInterval::reaching_back(10, 1, 1),       // 10
        ]
    }

    #[test]
    fn test_size_and_back() {
        let list = intervals();
        let iter = SynapseIterator::new(&list);
        assert_eq!(iter.size(), 6);
        assert_eq!(iter.back(), Some(10));
        assert_eq!(iter.last_interval().unwrap().reach_past_loops, 1);

        let empty: Vec<InputSynapseInterval> = Vec::new();
        assert_eq!(SynapseIterator::new(&empty).back(), None);
    }

    #[test]
    fn test_iterate_walks_every_index_in_order() {
        let list = intervals();
        let mut seen = Vec::new();
        SynapseIterator::new(&list).iterate_indices(|_, index| seen.push(index));
        assert_eq!(seen, vec![2, 3, 4, -1, -2, 10]);
    }

    #[test]
    fn test_fetch_matches_walk() {
        let list = intervals();
        let iter = SynapseIterator::new(&list);
        assert_eq!(iter.fetch(0), Some(2));
        assert_eq!(iter.fetch(4), Some(-2));
        assert_eq!(iter.fetch(5), Some(10));
        assert_eq!(iter.fetch(6), None);
    }

    #[test]
    fn test_iterate_range_covers_selected_intervals() {
        let list = intervals();
        let mut seen = Vec::new();
        SynapseIterator::new(&list).iterate_range(|_, index| seen.push(index), 1, 1);
        assert_eq!(seen, vec![-1, -2]);
    }

    #[test]
    fn test_terminatable_stops_early() {
        let list = intervals();
        let mut visited = 0;
        SynapseIterator::new(&list).iterate_terminatable(|_, _| {
            visited += 1;
            visited < 2
        });
        assert_eq!(visited, 2);
    }

    proptest! {
        #[test]
        fn prop_walk_agrees_with_size_and_back(
            raw in prop::collection::vec((-40i32..40, 1u32..6), 0..8)
        ) {
            let list: Vec<InputSynapseInterval> = raw
                .iter()
                .map(|&(starts, size)| InputSynapseInterval::new(starts, size))
                .collect();
            let iter = SynapseIterator::new(&list);

            let mut seen = Vec::new();
            iter.iterate_indices(|_, index| seen.push(index));

            prop_assert_eq!(seen.len() as u32, iter.size());
            prop_assert_eq!(seen.last().copied(), iter.back());
            for (n, &index) in seen.iter().enumerate() {
                prop_assert_eq!(iter.fetch(n as u32), Some(index));
            }
        }
    }
}
