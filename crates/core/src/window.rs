//! Rolling latency window

use std::collections::VecDeque;
use std::time::Duration;

/// Count-bounded ring of latency samples; the oldest sample is evicted first.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl LatencyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    /// Zero when empty
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().max().copied().unwrap_or(Duration::ZERO)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Duration> {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut window = LatencyWindow::new(3);
        for ms in [10, 20, 30, 40] {
            window.push(Duration::from_millis(ms));
        }
        assert_eq!(window.len(), 3);
        let kept: Vec<_> = window.iter().map(|d| d.as_millis()).collect();
        assert_eq!(kept, vec![20, 30, 40]);
        assert_eq!(window.average(), Duration::from_millis(30));
        assert_eq!(window.max(), Duration::from_millis(40));
        assert_eq!(window.latest(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_empty_window_reports_zero() {
        let window = LatencyWindow::new(0);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.average(), Duration::ZERO);
        assert_eq!(window.max(), Duration::ZERO);
    }
}
