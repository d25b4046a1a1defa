pub mod image_sequence;

use std::path::PathBuf;

use crate::common::CapturedFrame;
use crate::error::AppError;

pub use image_sequence::{ImageSequenceCapture, ImageSequenceOpener};

/// Where the live source reads its frames from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSpec {
    Camera(u32),
    File(PathBuf),
}

impl CaptureSpec {
    /// Name given to a take recorded from this source.
    pub fn label(&self) -> String {
        match self {
            CaptureSpec::Camera(index) => format!("camera-{}", index),
            CaptureSpec::File(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

impl std::fmt::Display for CaptureSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureSpec::Camera(index) => write!(f, "camera {}", index),
            CaptureSpec::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// An open capture handle.
pub trait CaptureSource: Send {
    fn spec(&self) -> &CaptureSpec;

    /// `Ok(None)` marks the end of the stream. An error only affects the
    /// current read.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, AppError>;
}

/// Opens capture handles; failing to open is fatal for the live producer.
pub trait CaptureOpener: Send + Sync {
    fn open(&self, spec: &CaptureSpec) -> Result<Box<dyn CaptureSource>, AppError>;
}
