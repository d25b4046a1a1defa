use tokio::sync::broadcast;
use tracing::{debug, info};

use super::deviation::significant_errors;
use super::repetition::RepetitionContext;
use super::smoothing::BoxFilter;
use crate::common::pose::sub;
use crate::common::{LivePrediction, ReplayFrame};
use crate::config::ComparisonConfig;
use crate::progress::{ProgressMode, ProgressSignal, ProgressState};
use crate::render::{FeedbackKind, Layer, Renderer};
use crate::session::{EndReason, SessionEvent};

/// What the session should do after handling an input.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Finish(EndReason),
}

/// Consumer-side comparison state. Lives on the session task only; producers
/// never touch it.
///
/// Replay frames are the clock: each one is stored under its frame index.
/// Each live prediction is compared against the most recently stored replay
/// frame.
pub struct ComparisonEngine {
    settings: ComparisonConfig,
    renderer: Box<dyn Renderer>,
    progress: ProgressState,
    events: broadcast::Sender<SessionEvent>,
    exercise_len: usize,
    epoch: u64,
    repetition: u32,
    context: Option<RepetitionContext>,
    smoother: BoxFilter,
    active: bool,
}

impl ComparisonEngine {
    pub fn new(
        settings: ComparisonConfig,
        progress: ProgressState,
        renderer: Box<dyn Renderer>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let smoother = BoxFilter::new(settings.smoothing_window);
        Self {
            settings,
            renderer,
            progress,
            events,
            exercise_len: 0,
            epoch: 0,
            repetition: 0,
            context: None,
            smoother,
            active: false,
        }
    }

    /// Starts comparing against an exercise of `exercise_len` frames whose
    /// replay output is tagged with `epoch`.
    pub fn begin(&mut self, exercise_len: usize, epoch: u64) -> Flow {
        self.exercise_len = exercise_len;
        self.epoch = epoch;
        self.repetition = 0;
        self.smoother.clear();
        self.progress.reset();
        self.renderer.reset();
        self.active = true;
        self.emit_progress();
        self.start_new_rep()
    }

    /// Tears down rendering and drops the repetition buffers.
    pub fn halt(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.context = None;
        self.smoother.clear();
        self.renderer.reset();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn repetition(&self) -> u32 {
        self.repetition
    }

    pub fn context(&self) -> Option<&RepetitionContext> {
        self.context.as_ref()
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_progress(&self) {
        self.emit(SessionEvent::ProgressChanged {
            mode: self.progress.mode(),
            counter: self.progress.counter(),
        });
    }

    fn start_new_rep(&mut self) -> Flow {
        if self.progress.mode() == ProgressMode::Repetition {
            let signal = self.progress.advance();
            self.emit_progress();
            if signal == ProgressSignal::Finished {
                return Flow::Finish(EndReason::TargetReached);
            }
        }

        self.repetition += 1;
        self.context = Some(RepetitionContext::new(self.repetition, self.exercise_len));
        self.renderer.render_error_vectors(&[]);
        debug!("Starting repetition {}", self.repetition);
        self.emit(SessionEvent::RepetitionStarted {
            repetition: self.repetition,
        });
        Flow::Continue
    }

    fn end_rep(&mut self) {
        let Some(context) = self.context.take() else {
            return;
        };
        let mse = context.mean_squared_error();
        let threshold = self.settings.correctness_threshold(self.progress.mode());
        let correct = mse.is_some_and(|mse| mse < threshold);
        if correct {
            self.renderer
                .play_feedback_animation(Layer::Replay, FeedbackKind::Correct);
        }
        info!(
            "Repetition {} finished with mse {:?}",
            context.number(),
            mse
        );
        self.emit(SessionEvent::RepetitionCompleted {
            repetition: context.number(),
            mse,
            correct,
        });
    }

    pub fn on_replay_frame(&mut self, frame: ReplayFrame) {
        if !self.active {
            return;
        }
        let index = frame.info.index;
        if frame.info.epoch != self.epoch || index >= self.exercise_len {
            debug!(
                "Discarding stale replay frame {} from epoch {}",
                index, frame.info.epoch
            );
            return;
        }
        let Some(context) = self.context.as_mut() else {
            return;
        };

        self.renderer
            .render(Layer::Replay, &frame.vertices, &frame.keypoints);
        context.record_expected(index, frame.keypoints);
        if index + 1 == self.exercise_len {
            // Evaluated after the next live prediction.
            context.mark_finished();
        }
    }

    pub fn on_live_prediction(&mut self, prediction: LivePrediction) -> Flow {
        if !self.active {
            return Flow::Continue;
        }
        let Some(context) = self.context.as_mut() else {
            return Flow::Continue;
        };
        let Some(expected) = context.latest_expected().copied() else {
            return Flow::Continue;
        };

        let smoothed = self.smoother.push(prediction.keypoints);
        context.record_error(sub(&expected, &smoothed));

        if let Some(momentary) = context.momentary_error(self.settings.error_window) {
            let overlay = significant_errors(&momentary, &smoothed, self.settings.error_threshold);
            for error in &overlay {
                debug!("{} is off by {:.3}", error.joint, error.magnitude);
            }
            self.renderer.render_error_vectors(&overlay);
        }

        self.renderer
            .render(Layer::Live, &prediction.vertices, &prediction.keypoints);
        context.advance_prediction();

        if context.is_finished() {
            self.end_rep();
            return self.start_new_rep();
        }
        Flow::Continue
    }

    /// One second of the countdown.
    pub fn tick_progress(&mut self) -> Flow {
        if !self.active || self.progress.mode() != ProgressMode::Timer {
            return Flow::Continue;
        }
        let signal = self.progress.tick();
        self.emit_progress();
        match signal {
            ProgressSignal::Finished => Flow::Finish(EndReason::TimerExpired),
            ProgressSignal::Continue => Flow::Continue,
        }
    }

    /// Switching into repetition mode mid-repetition counts the current one,
    /// which can already meet the target.
    pub fn set_progress_mode(&mut self, mode: ProgressMode) -> Flow {
        self.progress.set_mode(mode);
        let mut signal = ProgressSignal::Continue;
        if self.active && mode == ProgressMode::Repetition && self.context.is_some() {
            signal = self.progress.advance();
        }
        self.emit_progress();
        match signal {
            ProgressSignal::Finished => Flow::Finish(EndReason::TargetReached),
            ProgressSignal::Continue => Flow::Continue,
        }
    }
}
