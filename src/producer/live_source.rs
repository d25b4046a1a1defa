use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::producer_thread::{ProducerThread, Step, Workload};
use crate::capture::CaptureSource;
use crate::common::{LivePrediction, PoseParameters};
use crate::error::AppError;
use crate::model::LiveModel;

/// Pose parameters recorded from a capture source, ready to become an exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Take {
    pub id: Uuid,
    pub label: String,
    pub recorded_at: DateTime<Utc>,
    pub frames: Vec<PoseParameters>,
}

#[derive(Debug)]
pub enum LiveOutput {
    Prediction(LivePrediction),
    /// The capture ran out. Carries the take if one was being recorded.
    EndOfStream { take: Option<Take> },
}

/// Pulls frames from a capture source and runs the live model on them.
pub struct LiveSource {
    model: Box<dyn LiveModel>,
    capture: Option<Box<dyn CaptureSource>>,
    saving: bool,
    take: Vec<PoseParameters>,
}

impl LiveSource {
    pub fn new(model: Box<dyn LiveModel>) -> Self {
        Self {
            model,
            capture: None,
            saving: false,
            take: Vec::new(),
        }
    }

    /// Swaps the capture source and abandons any take in progress.
    pub fn set_capture(&mut self, capture: Box<dyn CaptureSource>) {
        debug!("Live source now reading from {}", capture.spec());
        self.capture = Some(capture);
        self.saving = false;
        self.take.clear();
    }

    /// Starts accumulating pose parameters from the next frame on.
    pub fn start_saving(&mut self) {
        self.saving = true;
        self.take.clear();
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    fn finish_take(&mut self) -> Option<Take> {
        if !self.saving {
            return None;
        }
        self.saving = false;
        let label = self
            .capture
            .as_ref()
            .map(|capture| capture.spec().label())
            .unwrap_or_else(|| "take".to_string());
        let take = Take {
            id: Uuid::new_v4(),
            label,
            recorded_at: Utc::now(),
            frames: std::mem::take(&mut self.take),
        };
        info!("Recorded take {} with {} frames", take.label, take.frames.len());
        Some(take)
    }
}

impl Workload for LiveSource {
    type Output = LiveOutput;

    fn load(&mut self) -> Result<(), AppError> {
        self.model.load()
    }

    fn step(&mut self, started_at: DateTime<Utc>) -> Result<Step<LiveOutput>, AppError> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(Step::Skip);
        };
        let Some(frame) = capture.next_frame()? else {
            let take = self.finish_take();
            return Ok(Step::Pause(Some(LiveOutput::EndOfStream { take })));
        };

        let inference = self.model.infer(&frame)?;
        if self.saving {
            match inference.pose_parameters {
                Some(parameters) => self.take.push(parameters),
                None => debug!("{} produced no pose parameters to record", self.model.name()),
            }
        }
        Ok(Step::Deliver(LiveOutput::Prediction(LivePrediction {
            vertices: inference.vertices,
            keypoints: inference.keypoints,
            timestamp: started_at,
        })))
    }
}

impl ProducerThread<LiveSource> {
    pub fn set_capture(&self, capture: Box<dyn CaptureSource>) -> Result<(), AppError> {
        self.with_paused_workload(|source| source.set_capture(capture))
    }

    pub fn start_saving(&self) -> Result<(), AppError> {
        self.with_paused_workload(LiveSource::start_saving)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSpec;
    use crate::sim::{MirrorLiveModel, SyntheticCamera, demo_exercise};

    fn source() -> LiveSource {
        let exercise = demo_exercise("wave", 6).expect("exercise");
        let mut source = LiveSource::new(Box::new(MirrorLiveModel::new(exercise)));
        source.load().expect("load");
        source
    }

    #[test]
    fn skips_without_capture() {
        let mut source = source();
        assert!(matches!(source.step(Utc::now()), Ok(Step::Skip)));
    }

    #[test]
    fn end_of_stream_flushes_take() {
        let mut source = source();
        let spec = CaptureSpec::File("front_raise.mp4".into());
        source.set_capture(Box::new(SyntheticCamera::new(spec).with_limit(3)));
        source.start_saving();

        for _ in 0..3 {
            assert!(matches!(
                source.step(Utc::now()),
                Ok(Step::Deliver(LiveOutput::Prediction(_)))
            ));
        }
        match source.step(Utc::now()) {
            Ok(Step::Pause(Some(LiveOutput::EndOfStream { take: Some(take) }))) => {
                assert_eq!(take.label, "front_raise");
                assert_eq!(take.frames.len(), 3);
            }
            other => panic!("expected a finished take, got {:?}", other),
        }
        assert!(!source.is_saving());
    }

    #[test]
    fn switching_capture_abandons_take() {
        let mut source = source();
        source.set_capture(Box::new(
            SyntheticCamera::new(CaptureSpec::Camera(0)).with_limit(1),
        ));
        source.start_saving();
        assert!(source.step(Utc::now()).is_ok());

        source.set_capture(Box::new(
            SyntheticCamera::new(CaptureSpec::Camera(1)).with_limit(0),
        ));
        assert!(!source.is_saving());
        assert!(matches!(
            source.step(Utc::now()),
            Ok(Step::Pause(Some(LiveOutput::EndOfStream { take: None })))
        ));
    }
}
