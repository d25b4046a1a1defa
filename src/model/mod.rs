//! Integration seam for the pose-inference backends.
//!
//! Both models are called repeatedly from their producer's own thread, so
//! implementations only need `Send`. Failures must come back as errors, never
//! as a wrongly-shaped result.

use crate::common::{CapturedFrame, Inference};
use crate::error::AppError;

/// Turns recorded pose parameters back into a mesh and keypoints.
pub trait PoseModel: Send {
    fn name(&self) -> &str;

    /// Called once on the producer thread before the first inference.
    fn load(&mut self) -> Result<(), AppError>;

    fn infer(&mut self, parameters: &[f32]) -> Result<Inference, AppError>;
}

/// Estimates a pose from a camera or video frame.
pub trait LiveModel: Send {
    fn name(&self) -> &str;

    fn load(&mut self) -> Result<(), AppError>;

    /// Implementations should fill `pose_parameters` so takes can be recorded.
    fn infer(&mut self, frame: &CapturedFrame) -> Result<Inference, AppError>;
}
