use chrono::{DateTime, Utc};
use image::DynamicImage;
use std::sync::Arc;
use uuid::Uuid;

/// A single image pulled from a capture source.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    source_id: Uuid,
    image: Arc<DynamicImage>,
    captured_at: DateTime<Utc>,
    sequence: u64,
}

impl CapturedFrame {
    pub fn new(
        source_id: Uuid,
        image: DynamicImage,
        captured_at: DateTime<Utc>,
        sequence: u64,
    ) -> Self {
        Self {
            source_id,
            image: Arc::new(image),
            captured_at,
            sequence,
        }
    }

    pub fn source_id(&self) -> Uuid {
        self.source_id
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Position of this frame within its source, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}
