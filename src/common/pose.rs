use chrono::{DateTime, Utc};

/// Number of SMPL body joints tracked by both pose models.
pub const KEYPOINT_COUNT: usize = 24;
/// 72 axis-angle pose values (24 joints x 3) followed by 10 shape coefficients.
pub const POSE_PARAMETER_COUNT: usize = 82;
pub const POSE_ANGLE_COUNT: usize = KEYPOINT_COUNT * 3;

pub type Vec3 = [f32; 3];
pub type Keypoints = [Vec3; KEYPOINT_COUNT];
pub type PoseParameters = Vec<f32>;

pub const ZERO_KEYPOINTS: Keypoints = [[0.0; 3]; KEYPOINT_COUNT];

/// Result of one model invocation.
#[derive(Debug, Clone)]
pub struct Inference {
    pub vertices: Vec<Vec3>,
    pub keypoints: Keypoints,
    /// Raw pose parameters, only produced by models that estimate them.
    pub pose_parameters: Option<PoseParameters>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    /// Bumped every time the replay source receives a new exercise.
    pub epoch: u64,
}

/// Ground truth produced by the replay source for one exercise frame.
#[derive(Debug, Clone)]
pub struct ReplayFrame {
    pub vertices: Vec<Vec3>,
    pub keypoints: Keypoints,
    pub info: FrameInfo,
}

/// Pose estimated from one live capture frame.
#[derive(Debug, Clone)]
pub struct LivePrediction {
    pub vertices: Vec<Vec3>,
    pub keypoints: Keypoints,
    pub timestamp: DateTime<Utc>,
}

pub fn sub(a: &Keypoints, b: &Keypoints) -> Keypoints {
    let mut out = ZERO_KEYPOINTS;
    for (joint, (lhs, rhs)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        for axis in 0..3 {
            joint[axis] = lhs[axis] - rhs[axis];
        }
    }
    out
}

/// Element-wise mean of a set of keypoint arrays. Empty input yields zeros.
pub fn mean<'a, I>(samples: I) -> Keypoints
where
    I: IntoIterator<Item = &'a Keypoints>,
{
    let mut out = ZERO_KEYPOINTS;
    let mut count = 0usize;
    for sample in samples {
        for (joint, value) in out.iter_mut().zip(sample.iter()) {
            for axis in 0..3 {
                joint[axis] += value[axis];
            }
        }
        count += 1;
    }
    if count > 0 {
        let scale = 1.0 / count as f32;
        for joint in out.iter_mut() {
            for axis in joint.iter_mut() {
                *axis *= scale;
            }
        }
    }
    out
}

pub fn norm(v: &Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
