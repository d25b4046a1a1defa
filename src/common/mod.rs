pub mod frame;
pub mod pose;
pub mod skeleton;

pub use frame::CapturedFrame;
pub use pose::{
    FrameInfo, Inference, KEYPOINT_COUNT, Keypoints, LivePrediction, POSE_PARAMETER_COUNT,
    PoseParameters, ReplayFrame, Vec3,
};
