use std::collections::VecDeque;

use crate::common::Keypoints;
use crate::common::pose::mean;

/// Trailing box filter over the most recent predictions.
#[derive(Debug, Clone)]
pub struct BoxFilter {
    window: usize,
    samples: VecDeque<Keypoints>,
}

impl BoxFilter {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// Adds a sample and returns the mean of the window.
    pub fn push(&mut self, sample: Keypoints) -> Keypoints {
        if self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        mean(self.samples.iter())
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
