use crate::common::pose::{ZERO_KEYPOINTS, mean};
use crate::common::Keypoints;

/// Buffers for one pass through the exercise. A fresh context is created for
/// every repetition and never resized.
#[derive(Debug, Clone)]
pub struct RepetitionContext {
    number: u32,
    /// Latest replay keypoints seen for each exercise frame.
    expected: Vec<Keypoints>,
    /// One error sample per live prediction, indexed by prediction count.
    errors: Vec<Keypoints>,
    correct_frame_index: Option<usize>,
    pred_frame_index: usize,
    finished: bool,
}

impl RepetitionContext {
    pub fn new(number: u32, exercise_len: usize) -> Self {
        Self {
            number,
            expected: vec![ZERO_KEYPOINTS; exercise_len],
            errors: vec![ZERO_KEYPOINTS; exercise_len],
            correct_frame_index: None,
            pred_frame_index: 0,
            finished: false,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn len(&self) -> usize {
        self.expected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected.is_empty()
    }

    pub fn record_expected(&mut self, index: usize, keypoints: Keypoints) {
        if let Some(slot) = self.expected.get_mut(index) {
            *slot = keypoints;
            self.correct_frame_index = Some(index);
        }
    }

    /// Keypoints of the most recently completed replay frame.
    pub fn latest_expected(&self) -> Option<&Keypoints> {
        self.correct_frame_index
            .and_then(|index| self.expected.get(index))
    }

    pub fn expected(&self) -> &[Keypoints] {
        &self.expected
    }

    pub fn correct_frame_index(&self) -> Option<usize> {
        self.correct_frame_index
    }

    pub fn pred_frame_index(&self) -> usize {
        self.pred_frame_index
    }

    /// Stores the error for the current prediction. Predictions past the
    /// end of the buffer are not kept.
    pub fn record_error(&mut self, error: Keypoints) {
        if let Some(slot) = self.errors.get_mut(self.pred_frame_index) {
            *slot = error;
        }
    }

    pub fn errors(&self) -> &[Keypoints] {
        &self.errors
    }

    /// Mean of the last `window` error samples ending at the current
    /// prediction, once at least `window` predictions came before it.
    pub fn momentary_error(&self, window: usize) -> Option<Keypoints> {
        let current = self.pred_frame_index;
        if window == 0 || current < window || current >= self.errors.len() {
            return None;
        }
        Some(mean(self.errors[current + 1 - window..=current].iter()))
    }

    pub fn advance_prediction(&mut self) {
        self.pred_frame_index += 1;
    }

    pub fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Mean squared error over the whole error buffer, one slot per exercise
    /// frame. Slots no prediction reached stay zero and count toward the mean.
    pub fn mean_squared_error(&self) -> Option<f32> {
        let values: usize = self.errors.iter().map(|sample| sample.len() * 3).sum();
        if values == 0 {
            return None;
        }
        let sum: f32 = self
            .errors
            .iter()
            .flat_map(|sample| sample.iter())
            .flat_map(|joint| joint.iter())
            .map(|value| value * value)
            .sum();
        Some(sum / values as f32)
    }
}
