use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::{CaptureOpener, CaptureSource, CaptureSpec};
use crate::common::CapturedFrame;
use crate::error::AppError;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Replays a directory of still images, sorted by file name, as a video file.
pub struct ImageSequenceCapture {
    id: Uuid,
    spec: CaptureSpec,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl ImageSequenceCapture {
    pub fn open(directory: &Path) -> Result<Self, AppError> {
        let entries = fs::read_dir(directory).map_err(|e| AppError::CaptureOpen {
            name: directory.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| is_image(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(AppError::CaptureOpen {
                name: directory.display().to_string(),
                reason: "no image frames found".to_string(),
            });
        }

        debug!(
            "Opened image sequence {} with {} frames",
            directory.display(),
            files.len()
        );
        Ok(Self {
            id: Uuid::new_v4(),
            spec: CaptureSpec::File(directory.to_path_buf()),
            files,
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

impl CaptureSource for ImageSequenceCapture {
    fn spec(&self) -> &CaptureSpec {
        &self.spec
    }

    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, AppError> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        let sequence = self.cursor as u64;
        // Advance first so an undecodable file is skipped, not retried forever.
        self.cursor += 1;

        let image = image::open(path)
            .map_err(|e| AppError::CaptureRead(format!("{}: {}", path.display(), e)))?;
        Ok(Some(CapturedFrame::new(self.id, image, Utc::now(), sequence)))
    }
}

/// Opens `CaptureSpec::File` directories; cameras need a platform backend.
#[derive(Debug, Default, Clone)]
pub struct ImageSequenceOpener;

impl CaptureOpener for ImageSequenceOpener {
    fn open(&self, spec: &CaptureSpec) -> Result<Box<dyn CaptureSource>, AppError> {
        match spec {
            CaptureSpec::File(path) => Ok(Box::new(ImageSequenceCapture::open(path)?)),
            CaptureSpec::Camera(_) => Err(AppError::CaptureOpen {
                name: spec.to_string(),
                reason: "no camera backend available".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, Rgb};

    fn write_frame(dir: &Path, name: &str, shade: u8) {
        let img = DynamicImage::ImageRgb8(ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(
            4,
            4,
            Rgb([shade, shade, shade]),
        ));
        img.save(dir.join(name)).expect("write frame");
    }

    #[test]
    fn reads_frames_in_name_order_then_ends() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_frame(dir.path(), "002.png", 20);
        write_frame(dir.path(), "001.png", 10);
        fs::write(dir.path().join("notes.txt"), "not a frame").expect("write notes");

        let mut capture = ImageSequenceCapture::open(dir.path()).expect("open");
        assert_eq!(capture.len(), 2);

        let first = capture.next_frame().expect("read").expect("frame");
        assert_eq!(first.sequence(), 0);
        assert_eq!(first.image().to_rgb8().get_pixel(0, 0), &Rgb([10, 10, 10]));

        let second = capture.next_frame().expect("read").expect("frame");
        assert_eq!(second.sequence(), 1);
        assert!(capture.next_frame().expect("read").is_none());
    }

    #[test]
    fn undecodable_frame_is_recoverable() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("000.png"), b"garbage").expect("write");
        write_frame(dir.path(), "001.png", 5);

        let mut capture = ImageSequenceCapture::open(dir.path()).expect("open");
        let err = capture.next_frame().expect_err("garbage should fail");
        assert!(!err.is_fatal());
        assert!(capture.next_frame().expect("read").is_some());
    }

    #[test]
    fn missing_directory_is_fatal() {
        let err = ImageSequenceOpener
            .open(&CaptureSpec::File(PathBuf::from("/definitely/not/here")))
            .err()
            .expect("open should fail");
        assert!(err.is_fatal());
        assert!(ImageSequenceOpener.open(&CaptureSpec::Camera(0)).is_err());
    }
}
