//! Sliding-window median filter

use std::collections::VecDeque;

/// Median over the most recent samples. Robust against the single-tick
/// speed spikes the host reports on collisions and respawns.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    window: VecDeque<f32>,
    size: usize,
}

impl MedianFilter {
    /// Create a filter over the last `size` samples (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            window: VecDeque::with_capacity(size),
            size,
        }
    }

    /// Add a sample; non-finite samples are ignored
    pub fn push(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        if self.window.len() == self.size {
            self.window.pop_front();
        }
        self.window.push_back(value);
    }

    /// Median of the current window, `None` while empty
    pub fn median(&self) -> Option<f32> {
        if self.window.is_empty() {
            return None;
        }
        let mut sorted: Vec<f32> = self.window.iter().copied().collect();
        sorted.sort_by(f32::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_median_removes_spike() {
        let mut filter = MedianFilter::new(5);
        for val in [10.0, 11.0, 10.0, 100.0, 10.0] {
            filter.push(val);
        }
        assert_eq!(filter.median(), Some(10.0));
    }

    #[test]
    fn test_window_slides() {
        let mut filter = MedianFilter::new(3);
        for val in [1.0, 2.0, 3.0, 20.0, 30.0] {
            filter.push(val);
        }
        assert_eq!(filter.len(), 3);
        assert_eq!(filter.median(), Some(20.0));
    }

    #[test]
    fn test_even_window_averages_middle() {
        let mut filter = MedianFilter::new(4);
        for val in [4.0, 1.0, 3.0, 2.0] {
            filter.push(val);
        }
        assert_eq!(filter.median(), Some(2.5));
    }

    #[test]
    fn test_ignores_nan() {
        let mut filter = MedianFilter::new(3);
        filter.push(f32::NAN);
        assert!(filter.is_empty());
        assert_eq!(filter.median(), None);
    }

    proptest! {
        #[test]
        fn prop_median_within_window(samples in proptest::collection::vec(0.0f32..100.0, 1..20)) {
            let mut filter = MedianFilter::new(5);
            for s in &samples {
                filter.push(*s);
            }
            let window = &samples[samples.len().saturating_sub(5)..];
            let lo = window.iter().copied().fold(f32::INFINITY, f32::min);
            let hi = window.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let median = filter.median().unwrap();
            prop_assert!(median >= lo && median <= hi);
        }
    }
}
