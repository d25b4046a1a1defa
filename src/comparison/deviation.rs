use serde::Serialize;

use crate::common::pose::norm;
use crate::common::skeleton::joint_name;
use crate::common::{Keypoints, Vec3};

/// One arrow of the error overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorVector {
    pub joint: &'static str,
    pub keypoint: usize,
    /// Smoothed predicted keypoint position.
    pub origin: Vec3,
    /// Momentary error; points from the prediction towards the ground truth.
    pub direction: Vec3,
    pub magnitude: f32,
}

/// Keypoints whose momentary error norm is above `threshold`.
pub fn significant_errors(
    momentary: &Keypoints,
    predicted: &Keypoints,
    threshold: f32,
) -> Vec<ErrorVector> {
    momentary
        .iter()
        .zip(predicted.iter())
        .enumerate()
        .filter_map(|(keypoint, (direction, origin))| {
            let magnitude = norm(direction);
            (magnitude > threshold).then(|| ErrorVector {
                joint: joint_name(keypoint),
                keypoint,
                origin: *origin,
                direction: *direction,
                magnitude,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pose::ZERO_KEYPOINTS;

    #[test]
    fn only_keypoints_above_threshold_are_drawn() {
        let mut momentary = ZERO_KEYPOINTS;
        momentary[4] = [0.25, 0.0, 0.0];
        momentary[9] = [0.0, 0.35, 0.0];
        let mut predicted = ZERO_KEYPOINTS;
        predicted[9] = [1.0, 2.0, 3.0];

        let errors = significant_errors(&momentary, &predicted, 0.3);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].keypoint, 9);
        assert_eq!(errors[0].origin, [1.0, 2.0, 3.0]);
        assert!((errors[0].magnitude - 0.35).abs() < 1e-6);
        assert_eq!(errors[0].joint, joint_name(9));
    }
}
