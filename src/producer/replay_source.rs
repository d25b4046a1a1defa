use chrono::{DateTime, Utc};
use tracing::debug;

use super::producer_thread::{ProducerThread, Step, Workload};
use crate::common::{FrameInfo, ReplayFrame};
use crate::error::AppError;
use crate::exercise::Exercise;
use crate::model::PoseModel;

/// Where to move the replay cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Absolute frame index.
    Frame(usize),
    /// Relative jump in seconds, converted to frames at the replay rate.
    Offset(f32),
}

/// Steps through an exercise's frames forever, wrapping at the end.
pub struct ReplaySource {
    model: Box<dyn PoseModel>,
    exercise: Option<Exercise>,
    frame_index: usize,
    epoch: u64,
    target_fps: u32,
}

impl ReplaySource {
    pub fn new(model: Box<dyn PoseModel>, target_fps: u32) -> Self {
        Self {
            model,
            exercise: None,
            frame_index: 0,
            epoch: 0,
            target_fps,
        }
    }

    /// Replaces the exercise and rewinds to frame 0. Returns the new epoch,
    /// which tags every frame produced from this exercise.
    pub fn assign_exercise(&mut self, exercise: Exercise) -> u64 {
        self.epoch += 1;
        self.frame_index = 0;
        debug!(
            "Replay assigned {} ({} frames), epoch {}",
            exercise.name(),
            exercise.len(),
            self.epoch
        );
        self.exercise = Some(exercise);
        self.epoch
    }

    pub fn exercise(&self) -> Option<&Exercise> {
        self.exercise.as_ref()
    }

    /// Index of the next frame to be produced.
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Moves the cursor, clamped to the exercise. Returns the new index.
    pub fn seek(&mut self, target: SeekTarget) -> usize {
        let Some(exercise) = &self.exercise else {
            return 0;
        };
        let last = exercise.len() - 1;
        self.frame_index = match target {
            SeekTarget::Frame(index) => index.min(last),
            SeekTarget::Offset(seconds) => {
                let delta = (seconds * self.target_fps as f32).round() as i64;
                (self.frame_index as i64 + delta).clamp(0, last as i64) as usize
            }
        };
        self.frame_index
    }
}

impl Workload for ReplaySource {
    type Output = ReplayFrame;

    fn load(&mut self) -> Result<(), AppError> {
        self.model.load()
    }

    fn step(&mut self, started_at: DateTime<Utc>) -> Result<Step<ReplayFrame>, AppError> {
        let Some(exercise) = &self.exercise else {
            return Ok(Step::Skip);
        };
        let index = self.frame_index;
        let inference = self.model.infer(exercise.frame(index))?;
        self.frame_index = (index + 1) % exercise.len();

        Ok(Step::Deliver(ReplayFrame {
            vertices: inference.vertices,
            keypoints: inference.keypoints,
            info: FrameInfo {
                index,
                timestamp: started_at,
                epoch: self.epoch,
            },
        }))
    }
}

impl ProducerThread<ReplaySource> {
    /// Re-renders a single frame at the new position and stays paused.
    pub fn seek(&self, target: SeekTarget) -> usize {
        self.pause();
        let index = self.with_workload(|source| source.seek(target));
        self.step_once();
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::ProducerEvent;
    use crate::sim::{LinearPoseModel, demo_exercise};
    use tokio::sync::mpsc;

    fn next_frame(rx: &mut mpsc::Receiver<ProducerEvent<ReplayFrame>>) -> ReplayFrame {
        loop {
            match rx.blocking_recv() {
                Some(ProducerEvent::Output(frame)) => return frame,
                Some(ProducerEvent::Ready) => continue,
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn frame_index_wraps_around() {
        let (tx, mut rx) = mpsc::channel(64);
        let source = ReplaySource::new(Box::new(LinearPoseModel::new()), 500);
        let mut producer = ProducerThread::new("replay", 500, source, tx);
        producer.start().expect("start");

        let exercise = demo_exercise("wave", 4).expect("exercise");
        let epoch = producer
            .with_paused_workload(|source| source.assign_exercise(exercise))
            .expect("paused");
        producer.resume();

        for k in 0..10 {
            let frame = next_frame(&mut rx);
            assert_eq!(frame.info.index, k % 4);
            assert_eq!(frame.info.epoch, epoch);
        }
    }

    #[test]
    fn seek_clamps_and_converts_offsets() {
        let mut source = ReplaySource::new(Box::new(LinearPoseModel::new()), 10);
        assert_eq!(source.seek(SeekTarget::Frame(3)), 0);

        source.assign_exercise(demo_exercise("wave", 40).expect("exercise"));
        assert_eq!(source.seek(SeekTarget::Frame(100)), 39);
        assert_eq!(source.seek(SeekTarget::Offset(-1.5)), 24);
        assert_eq!(source.seek(SeekTarget::Offset(-10.0)), 0);
    }

    #[test]
    fn reassigning_resets_cursor_and_bumps_epoch() {
        let mut source = ReplaySource::new(Box::new(LinearPoseModel::new()), 10);
        let first = source.assign_exercise(demo_exercise("wave", 8).expect("exercise"));
        source.seek(SeekTarget::Frame(5));
        let second = source.assign_exercise(demo_exercise("squat", 8).expect("exercise"));
        assert_eq!(second, first + 1);
        assert_eq!(source.frame_index(), 0);
    }

    #[test]
    fn seek_renders_one_frame_while_paused() {
        let (tx, mut rx) = mpsc::channel(64);
        let source = ReplaySource::new(Box::new(LinearPoseModel::new()), 500);
        let mut producer = ProducerThread::new("replay", 500, source, tx);
        producer.start().expect("start");
        producer
            .with_paused_workload(|source| {
                source.assign_exercise(demo_exercise("wave", 20).expect("exercise"))
            })
            .expect("paused");

        assert_eq!(producer.seek(SeekTarget::Frame(12)), 12);
        assert_eq!(next_frame(&mut rx).info.index, 12);
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
        assert!(producer.is_paused());
    }
}
