//! Deterministic stand-ins for the models, capture devices and renderer.
//!
//! Used by the demo binary and the tests; none of it touches real hardware.

use std::f32::consts::TAU;
use std::sync::Arc;

use chrono::Utc;
use image::{DynamicImage, ImageBuffer, Rgb};
use parking_lot::Mutex;
use rand::Rng;
use uuid::Uuid;

use crate::capture::{CaptureOpener, CaptureSource, CaptureSpec};
use crate::common::pose::{POSE_ANGLE_COUNT, ZERO_KEYPOINTS};
use crate::common::{CapturedFrame, Inference, Keypoints, POSE_PARAMETER_COUNT, Vec3};
use crate::comparison::ErrorVector;
use crate::error::AppError;
use crate::exercise::Exercise;
use crate::model::{LiveModel, PoseModel};
use crate::render::{FeedbackKind, Layer, Renderer};

/// Reads keypoint `j` straight from pose parameters `3j..3j+3`.
fn keypoints_from(parameters: &[f32]) -> Result<Keypoints, AppError> {
    if parameters.len() < POSE_ANGLE_COUNT {
        return Err(AppError::Inference(format!(
            "expected at least {} pose parameters, got {}",
            POSE_ANGLE_COUNT,
            parameters.len()
        )));
    }
    let mut keypoints = ZERO_KEYPOINTS;
    for (joint, values) in keypoints.iter_mut().zip(parameters.chunks_exact(3)) {
        joint.copy_from_slice(values);
    }
    Ok(keypoints)
}

/// A sine-wave exercise with `frames` frames.
pub fn demo_exercise(name: &str, frames: usize) -> Result<Exercise, AppError> {
    let count = frames.max(1) as f32;
    let data = (0..frames)
        .map(|index| {
            let phase = TAU * index as f32 / count;
            (0..POSE_PARAMETER_COUNT)
                .map(|parameter| {
                    if parameter < POSE_ANGLE_COUNT {
                        0.5 * (phase + parameter as f32 * 0.1).sin()
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect();
    Exercise::new(name, data)
}

pub struct LinearPoseModel {
    available: bool,
    loaded: bool,
}

impl Default for LinearPoseModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearPoseModel {
    pub fn new() -> Self {
        Self {
            available: true,
            loaded: false,
        }
    }

    /// A model whose weights cannot be loaded.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            loaded: false,
        }
    }
}

impl PoseModel for LinearPoseModel {
    fn name(&self) -> &str {
        "linear-pose"
    }

    fn load(&mut self) -> Result<(), AppError> {
        if !self.available {
            return Err(AppError::ModelLoad {
                model: self.name().to_string(),
                reason: "weights unavailable".to_string(),
            });
        }
        self.loaded = true;
        Ok(())
    }

    fn infer(&mut self, parameters: &[f32]) -> Result<Inference, AppError> {
        if !self.loaded {
            return Err(AppError::ModelUnavailable(self.name().to_string()));
        }
        let keypoints = keypoints_from(parameters)?;
        Ok(Inference {
            vertices: keypoints.to_vec(),
            keypoints,
            pose_parameters: Some(parameters.to_vec()),
        })
    }
}

/// Pretends the user mirrors the exercise perfectly, plus optional noise.
/// Frame `n` of the capture maps to exercise frame `n mod len`.
pub struct MirrorLiveModel {
    exercise: Exercise,
    noise: f32,
    loaded: bool,
}

impl MirrorLiveModel {
    pub fn new(exercise: Exercise) -> Self {
        Self {
            exercise,
            noise: 0.0,
            loaded: false,
        }
    }

    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise.abs();
        self
    }
}

impl LiveModel for MirrorLiveModel {
    fn name(&self) -> &str {
        "mirror-live"
    }

    fn load(&mut self) -> Result<(), AppError> {
        self.loaded = true;
        Ok(())
    }

    fn infer(&mut self, frame: &CapturedFrame) -> Result<Inference, AppError> {
        if !self.loaded {
            return Err(AppError::ModelUnavailable(self.name().to_string()));
        }
        let index = (frame.sequence() % self.exercise.len() as u64) as usize;
        let mut parameters = self.exercise.frame(index).to_vec();
        if self.noise > 0.0 {
            let mut rng = rand::rng();
            for value in parameters.iter_mut().take(POSE_ANGLE_COUNT) {
                *value += rng.random_range(-self.noise..=self.noise);
            }
        }
        let keypoints = keypoints_from(&parameters)?;
        Ok(Inference {
            vertices: keypoints.to_vec(),
            keypoints,
            pose_parameters: Some(parameters),
        })
    }
}

/// Produces small solid-color frames, optionally ending after `limit`.
pub struct SyntheticCamera {
    id: Uuid,
    spec: CaptureSpec,
    sequence: u64,
    limit: Option<u64>,
}

impl SyntheticCamera {
    pub fn new(spec: CaptureSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            spec,
            sequence: 0,
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl CaptureSource for SyntheticCamera {
    fn spec(&self) -> &CaptureSpec {
        &self.spec
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, AppError> {
        if self.limit.is_some_and(|limit| self.sequence >= limit) {
            return Ok(None);
        }
        let shade = (self.sequence % 256) as u8;
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(8, 8, Rgb([shade; 3])));
        let frame = CapturedFrame::new(self.id, image, Utc::now(), self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }
}

/// Cameras never end; files end after `file_frames` frames.
#[derive(Debug, Clone)]
pub struct SyntheticCaptureOpener {
    file_frames: u64,
    camera_available: bool,
}

impl Default for SyntheticCaptureOpener {
    fn default() -> Self {
        Self {
            file_frames: 30,
            camera_available: true,
        }
    }
}

impl SyntheticCaptureOpener {
    pub fn with_file_frames(mut self, frames: u64) -> Self {
        self.file_frames = frames;
        self
    }

    pub fn without_camera(mut self) -> Self {
        self.camera_available = false;
        self
    }
}

impl CaptureOpener for SyntheticCaptureOpener {
    fn open(&self, spec: &CaptureSpec) -> Result<Box<dyn CaptureSource>, AppError> {
        match spec {
            CaptureSpec::Camera(_) if !self.camera_available => Err(AppError::CaptureOpen {
                name: spec.to_string(),
                reason: "device busy".to_string(),
            }),
            CaptureSpec::Camera(_) => Ok(Box::new(SyntheticCamera::new(spec.clone()))),
            CaptureSpec::File(_) => Ok(Box::new(
                SyntheticCamera::new(spec.clone()).with_limit(self.file_frames),
            )),
        }
    }
}

#[derive(Debug, Default)]
pub struct RenderLog {
    pub replay_frames: usize,
    pub live_frames: usize,
    pub overlays: Vec<Vec<ErrorVector>>,
    pub feedback: Vec<(Layer, FeedbackKind)>,
    pub resets: usize,
}

/// Records every call into a shared [`RenderLog`].
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    log: Arc<Mutex<RenderLog>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> Arc<Mutex<RenderLog>> {
        self.log.clone()
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, layer: Layer, _vertices: &[Vec3], _keypoints: &Keypoints) {
        let mut log = self.log.lock();
        match layer {
            Layer::Replay => log.replay_frames += 1,
            Layer::Live => log.live_frames += 1,
        }
    }

    fn render_error_vectors(&mut self, errors: &[ErrorVector]) {
        self.log.lock().overlays.push(errors.to_vec());
    }

    fn play_feedback_animation(&mut self, layer: Layer, kind: FeedbackKind) {
        self.log.lock().feedback.push((layer, kind));
    }

    fn reset(&mut self) {
        self.log.lock().resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_model_needs_loading() {
        let mut model = LinearPoseModel::new();
        let exercise = demo_exercise("wave", 5).expect("exercise");
        assert!(model.infer(exercise.frame(0)).is_err());
        model.load().expect("load");
        let inference = model.infer(exercise.frame(2)).expect("infer");
        assert_eq!(inference.keypoints[1][0], exercise.frame(2)[3]);
        assert!(LinearPoseModel::unavailable().load().is_err());
    }

    #[test]
    fn mirror_model_follows_capture_sequence() {
        let exercise = demo_exercise("wave", 4).expect("exercise");
        let mut model = MirrorLiveModel::new(exercise.clone());
        model.load().expect("load");
        let mut camera = SyntheticCamera::new(CaptureSpec::Camera(0));
        for expected in [0, 1, 2, 3, 0] {
            let frame = camera.next_frame().expect("read").expect("frame");
            let inference = model.infer(&frame).expect("infer");
            assert_eq!(
                inference.pose_parameters.as_deref(),
                Some(exercise.frame(expected))
            );
        }
    }

    #[test]
    fn opener_limits_files_only() {
        let opener = SyntheticCaptureOpener::default().with_file_frames(2);
        let mut file = opener
            .open(&CaptureSpec::File("take.mp4".into()))
            .expect("open file");
        assert!(file.next_frame().expect("read").is_some());
        assert!(file.next_frame().expect("read").is_some());
        assert!(file.next_frame().expect("read").is_none());

        let closed = SyntheticCaptureOpener::default().without_camera();
        assert!(closed.open(&CaptureSpec::Camera(0)).is_err());
    }
}
