use crate::common::PoseParameters;
use crate::common::pose::POSE_ANGLE_COUNT;

/// Centered moving average over each joint's axis-angle triple.
///
/// The window spans `window / 2` frames back and `ceil(window / 2)` frames
/// forward. The exclusive right bound is clamped to the last frame index, so
/// the final frame averages only the frames before it. Shape coefficients are
/// left untouched. Averages are taken from the unsmoothed input.
pub fn smooth_pose_parameters(frames: &mut [PoseParameters], window: usize) {
    if frames.len() < 2 || window < 2 {
        return;
    }
    let left = window / 2;
    let right = window - left;
    let unsmoothed: Vec<PoseParameters> = frames.to_vec();
    let count = unsmoothed.len();

    for (index, frame) in frames.iter_mut().enumerate() {
        let start = index.saturating_sub(left);
        // start < end holds for window >= 2 and count >= 2
        let end = (index + right).min(count - 1);
        let span = (end - start) as f32;
        for angle in 0..POSE_ANGLE_COUNT.min(frame.len()) {
            let sum: f32 = unsmoothed[start..end].iter().map(|other| other[angle]).sum();
            frame[angle] = sum / span;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::POSE_PARAMETER_COUNT;

    fn ramp(len: usize) -> Vec<PoseParameters> {
        (0..len)
            .map(|i| vec![i as f32; POSE_PARAMETER_COUNT])
            .collect()
    }

    #[test]
    fn averages_pose_angles_only() {
        let mut frames = ramp(5);
        smooth_pose_parameters(&mut frames, 3);

        // window 3: one frame back, two forward (exclusive, capped at N-1)
        assert_eq!(frames[0][0], 0.5);
        assert_eq!(frames[2][0], 2.0);
        assert_eq!(frames[3][0], 2.5);
        assert_eq!(frames[4][0], 3.0);
        // shape coefficients untouched
        assert_eq!(frames[0][POSE_ANGLE_COUNT], 0.0);
        assert_eq!(frames[4][POSE_PARAMETER_COUNT - 1], 4.0);
    }

    #[test]
    fn constant_signal_is_unchanged() {
        let mut frames = vec![vec![0.7; POSE_PARAMETER_COUNT]; 12];
        smooth_pose_parameters(&mut frames, 10);
        assert!(frames
            .iter()
            .all(|frame| frame.iter().all(|v| (v - 0.7).abs() < 1e-6)));
    }

    #[test]
    fn two_frames_share_the_first_frame() {
        let mut frames = ramp(2);
        smooth_pose_parameters(&mut frames, 2);
        assert_eq!(frames[0][0], 0.0);
        assert_eq!(frames[1][0], 0.0);
    }

    #[test]
    fn single_frame_is_left_alone() {
        let mut frames = ramp(1);
        smooth_pose_parameters(&mut frames, 10);
        assert_eq!(frames[0][0], 0.0);
    }
}
