//! Output seam towards whatever draws the avatars.
//!
//! Calls are fire-and-forget: implementations must not block the session task.

use tracing::{debug, trace};

use crate::common::{Keypoints, Vec3};
use crate::comparison::ErrorVector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Replay,
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Color flash played on the replay avatar after a correct repetition.
    Correct,
}

pub trait Renderer: Send {
    fn render(&mut self, layer: Layer, vertices: &[Vec3], keypoints: &Keypoints);

    /// Replaces the current overlay; an empty slice clears it.
    fn render_error_vectors(&mut self, errors: &[ErrorVector]);

    fn play_feedback_animation(&mut self, layer: Layer, kind: FeedbackKind);

    fn reset(&mut self);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _layer: Layer, _vertices: &[Vec3], _keypoints: &Keypoints) {}

    fn render_error_vectors(&mut self, _errors: &[ErrorVector]) {}

    fn play_feedback_animation(&mut self, _layer: Layer, _kind: FeedbackKind) {}

    fn reset(&mut self) {}
}

/// Logs render calls, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn render(&mut self, layer: Layer, vertices: &[Vec3], _keypoints: &Keypoints) {
        trace!("Rendering {:?} mesh with {} vertices", layer, vertices.len());
    }

    fn render_error_vectors(&mut self, errors: &[ErrorVector]) {
        if !errors.is_empty() {
            let joints: Vec<&str> = errors.iter().map(|error| error.joint).collect();
            debug!("Highlighting {}", joints.join(", "));
        }
    }

    fn play_feedback_animation(&mut self, layer: Layer, kind: FeedbackKind) {
        debug!("Playing {:?} feedback on {:?}", kind, layer);
    }

    fn reset(&mut self) {
        trace!("Renderer reset");
    }
}
