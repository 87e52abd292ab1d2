//! Incremental sliding-window mean.
//!
//! While the window is filling the mean is the running cumulative mean;
//! once it holds `width` samples each new sample replaces the oldest and
//! the mean moves by `(new - oldest) / width`. No full re-summation is
//! performed, so long runs accumulate rounding error the same way the
//! detector math always has.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SlidingMean {
    samples: VecDeque<f64>,
    width: usize,
    mean: f64,
}

impl SlidingMean {
    pub fn new(width: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(width + 1),
            width,
            mean: 0.0,
        }
    }

    /// Add a sample and return the updated mean.
    pub fn push(&mut self, sample: f64) -> f64 {
        self.samples.push_back(sample);
        if self.samples.len() > self.width {
            if let Some(oldest) = self.samples.pop_front() {
                self.mean += (sample - oldest) / self.width as f64;
            }
        } else {
            let n = self.samples.len() as f64;
            let prev_sum = self.mean * (n - 1.0);
            self.mean = (prev_sum + sample) / n;
        }
        self.mean
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True once `width` samples are held.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.width
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.mean = 0.0;
    }
}
