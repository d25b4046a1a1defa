pub mod library;
pub mod rules;
pub mod smoothing;

use std::sync::Arc;

use crate::common::{POSE_PARAMETER_COUNT, PoseParameters};
use crate::error::AppError;

pub use library::ExerciseLibrary;
pub use rules::PoseRule;
pub use smoothing::smooth_pose_parameters;

/// A recorded reference performance: one pose-parameter vector per frame.
///
/// Cloning is cheap; the frames are shared and never mutated in place once
/// handed to a replay source.
#[derive(Debug, Clone)]
pub struct Exercise {
    name: String,
    frames: Arc<Vec<PoseParameters>>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, frames: Vec<PoseParameters>) -> Result<Self, AppError> {
        let name = name.into();
        if frames.is_empty() {
            return Err(AppError::InvalidExercise(format!(
                "exercise {} has no frames",
                name
            )));
        }
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, frame)| frame.len() != POSE_PARAMETER_COUNT)
        {
            return Err(AppError::InvalidExercise(format!(
                "exercise {} frame {} has {} parameters, expected {}",
                name,
                index,
                frame.len(),
                POSE_PARAMETER_COUNT
            )));
        }
        Ok(Self {
            name,
            frames: Arc::new(frames),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// # Panics
    /// If `index >= self.len()`.
    pub fn frame(&self, index: usize) -> &[f32] {
        &self.frames[index]
    }

    pub fn frames(&self) -> &[PoseParameters] {
        &self.frames
    }

    /// Copy-on-write access used by the library when editing.
    pub(crate) fn frames_mut(&mut self) -> &mut Vec<PoseParameters> {
        Arc::make_mut(&mut self.frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_malformed_exercises() {
        assert!(matches!(
            Exercise::new("empty", vec![]),
            Err(AppError::InvalidExercise(_))
        ));
        assert!(Exercise::new("short", vec![vec![0.0; 10]]).is_err());
    }

    #[test]
    fn clones_share_frames_until_edited() {
        let exercise =
            Exercise::new("squat", vec![vec![0.0; POSE_PARAMETER_COUNT]; 4]).expect("valid");
        let mut edited = exercise.clone();
        assert!(Arc::ptr_eq(&exercise.frames, &edited.frames));

        edited.frames_mut()[0][0] = 1.0;
        assert_eq!(exercise.frame(0)[0], 0.0);
        assert_eq!(edited.frame(0)[0], 1.0);
        assert_eq!(edited.len(), 4);
    }
}
