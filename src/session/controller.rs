use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::events::{EndReason, SessionEvent};
use super::handle::SessionCommand;
use crate::capture::{CaptureOpener, CaptureSpec};
use crate::common::ReplayFrame;
use crate::comparison::{ComparisonEngine, Flow};
use crate::error::AppError;
use crate::exercise::Exercise;
use crate::producer::{
    LiveOutput, LiveSource, ProducerEvent, ProducerState, ProducerThread, ReplaySource,
    SeekTarget, Take,
};
use crate::progress::ProgressMode;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Stopped,
    Initializing,
    Running { paused: bool },
    /// Only the live producer runs, saving a take.
    Recording,
}

#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub state: ControllerState,
    pub exercise: Option<String>,
    pub repetition: u32,
    pub progress_mode: ProgressMode,
    pub progress_counter: u32,
    pub replay: ProducerState,
    pub live: ProducerState,
}

/// The two started producers and the receiving ends of their channels.
pub struct Producers {
    pub replay: ProducerThread<ReplaySource>,
    pub replay_rx: mpsc::Receiver<ProducerEvent<ReplayFrame>>,
    pub live: ProducerThread<LiveSource>,
    pub live_rx: mpsc::Receiver<ProducerEvent<LiveOutput>>,
}

/// Owns both producers and runs every consumer-side handler on one task.
pub struct ComparisonController {
    // Receivers are declared first so they drop before the producers join.
    replay_rx: mpsc::Receiver<ProducerEvent<ReplayFrame>>,
    live_rx: mpsc::Receiver<ProducerEvent<LiveOutput>>,
    command_rx: mpsc::Receiver<SessionCommand>,
    replay: ProducerThread<ReplaySource>,
    live: ProducerThread<LiveSource>,
    engine: ComparisonEngine,
    opener: Arc<dyn CaptureOpener>,
    camera: CaptureSpec,
    events: broadcast::Sender<SessionEvent>,
    state: ControllerState,
    timer: Option<Interval>,
    session_id: Uuid,
    exercise: Option<String>,
    replay_ready: bool,
    live_ready: bool,
    failure: Option<(String, String)>,
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl ComparisonController {
    pub fn new(
        session_id: Uuid,
        producers: Producers,
        engine: ComparisonEngine,
        opener: Arc<dyn CaptureOpener>,
        camera: CaptureSpec,
        command_rx: mpsc::Receiver<SessionCommand>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            replay_rx: producers.replay_rx,
            live_rx: producers.live_rx,
            command_rx,
            replay: producers.replay,
            live: producers.live,
            engine,
            opener,
            camera,
            events,
            state: ControllerState::Stopped,
            timer: None,
            session_id,
            exercise: None,
            replay_ready: false,
            live_ready: false,
            failure: None,
        }
    }

    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!("Session {} ready for commands", self.session_id);
        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    debug!("Session {} cancelled", self.session_id);
                    break;
                }
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(event) = self.replay_rx.recv() => self.on_replay_event(event),
                Some(event) = self.live_rx.recv() => self.on_live_event(event),
                _ = next_tick(&mut self.timer) => {
                    let flow = self.engine.tick_progress();
                    self.apply(flow);
                }
            }
        }

        self.stop();
        self.replay.stop();
        self.live.stop();
        info!("Session {} finished", self.session_id);
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Initialize {
                exercise,
                responder,
            } => {
                let result = self.initialize(exercise).await;
                let _ = responder.send(result);
            }
            SessionCommand::Pause { responder } => {
                let _ = responder.send(self.pause());
            }
            SessionCommand::Resume { responder } => {
                let _ = responder.send(self.resume());
            }
            SessionCommand::Stop { responder } => {
                self.stop();
                let _ = responder.send(());
            }
            SessionCommand::Seek { target, responder } => {
                let _ = responder.send(self.seek(target));
            }
            SessionCommand::Record { spec, responder } => {
                let result = self.record(spec).await;
                let _ = responder.send(result);
            }
            SessionCommand::SetProgressMode { mode, responder } => {
                let flow = self.engine.set_progress_mode(mode);
                self.sync_timer();
                self.apply(flow);
                let _ = responder.send(());
            }
            SessionCommand::Status { responder } => {
                let _ = responder.send(self.status());
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.session_id,
            state: self.state,
            exercise: self.exercise.clone(),
            repetition: self.engine.repetition(),
            progress_mode: self.engine.progress().mode(),
            progress_counter: self.engine.progress().counter(),
            replay: self.replay.state(),
            live: self.live.state(),
        }
    }

    fn failure_error(&self) -> Option<AppError> {
        self.failure
            .as_ref()
            .map(|(producer, reason)| AppError::ProducerFailed {
                producer: producer.clone(),
                reason: reason.clone(),
            })
    }

    /// Waits for both models to finish loading.
    async fn wait_until_ready(&mut self) -> Result<(), AppError> {
        while !(self.replay_ready && self.live_ready) {
            if let Some(error) = self.failure_error() {
                return Err(error);
            }
            tokio::select! {
                event = self.replay_rx.recv() => match event {
                    Some(event) => self.on_replay_event(event),
                    None => {
                        let name = self.replay.name().to_string();
                        self.on_producer_failed(&name, "producer exited".to_string());
                    }
                },
                event = self.live_rx.recv() => match event {
                    Some(event) => self.on_live_event(event),
                    None => {
                        let name = self.live.name().to_string();
                        self.on_producer_failed(&name, "producer exited".to_string());
                    }
                },
            }
        }
        match self.failure_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Drops outputs still queued from before, keeping lifecycle events.
    fn drain(&mut self) {
        while let Ok(event) = self.replay_rx.try_recv() {
            if !matches!(event, ProducerEvent::Output(_)) {
                self.on_replay_event(event);
            }
        }
        while let Ok(event) = self.live_rx.try_recv() {
            if !matches!(event, ProducerEvent::Output(_)) {
                self.on_live_event(event);
            }
        }
    }

    fn pause_producers(&mut self) {
        self.replay.pause();
        self.live.pause();
        debug_assert!(self.replay.is_paused() && self.live.is_paused());
    }

    fn resume_producers(&mut self) {
        self.replay.resume();
        self.live.resume();
        debug_assert!(!self.replay.is_paused() && !self.live.is_paused());
    }

    fn sync_timer(&mut self) {
        let wanted = self.state == ControllerState::Running { paused: false }
            && self.engine.progress().mode() == ProgressMode::Timer;
        if wanted && self.timer.is_none() {
            let mut timer = tokio::time::interval_at(Instant::now() + TICK, TICK);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.timer = Some(timer);
        } else if !wanted {
            self.timer = None;
        }
    }

    async fn initialize(&mut self, exercise: Exercise) -> Result<(), AppError> {
        if let Some(error) = self.failure_error() {
            return Err(error);
        }
        self.stop();
        self.state = ControllerState::Initializing;

        if let Err(e) = self.wait_until_ready().await {
            self.state = ControllerState::Stopped;
            return Err(e);
        }
        self.drain();

        let name = exercise.name().to_string();
        let frames = exercise.len();
        let epoch = match self
            .replay
            .with_paused_workload(|source| source.assign_exercise(exercise))
        {
            Ok(epoch) => epoch,
            Err(e) => {
                self.state = ControllerState::Stopped;
                return Err(e);
            }
        };

        let capture = match self.opener.open(&self.camera) {
            Ok(capture) => capture,
            Err(e) => {
                error!("Cannot open {}: {}", self.camera, e);
                self.finish(EndReason::ProducerFailed {
                    producer: self.live.name().to_string(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        if let Err(e) = self.live.set_capture(capture) {
            self.state = ControllerState::Stopped;
            return Err(e);
        }

        let flow = self.engine.begin(frames, epoch);
        self.state = ControllerState::Running { paused: false };
        self.exercise = Some(name.clone());
        self.resume_producers();
        self.sync_timer();
        info!("Session {} comparing against {}", self.session_id, name);
        self.emit(SessionEvent::Started {
            session_id: self.session_id,
            exercise: name,
            frames,
        });
        self.apply(flow);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AppError> {
        match self.state {
            ControllerState::Running { paused: false } => {
                self.pause_producers();
                self.state = ControllerState::Running { paused: true };
                self.sync_timer();
                Ok(())
            }
            ControllerState::Running { paused: true } => Ok(()),
            state => Err(AppError::InvalidState(format!("cannot pause while {:?}", state))),
        }
    }

    fn resume(&mut self) -> Result<(), AppError> {
        match self.state {
            ControllerState::Running { paused: true } => {
                self.resume_producers();
                self.state = ControllerState::Running { paused: false };
                self.sync_timer();
                Ok(())
            }
            ControllerState::Running { paused: false } => Ok(()),
            state => Err(AppError::InvalidState(format!(
                "cannot resume while {:?}",
                state
            ))),
        }
    }

    /// Idempotent; only a running session reports `SessionEnded`.
    fn stop(&mut self) {
        if self.state == ControllerState::Stopped {
            return;
        }
        self.finish(EndReason::Stopped);
    }

    fn finish(&mut self, reason: EndReason) {
        self.pause_producers();
        self.engine.halt();
        self.state = ControllerState::Stopped;
        self.sync_timer();
        info!("Session {} ended: {:?}", self.session_id, reason);
        self.emit(SessionEvent::SessionEnded { reason });
    }

    fn apply(&mut self, flow: Flow) {
        if let Flow::Finish(reason) = flow {
            self.finish(reason);
        }
    }

    fn seek(&mut self, target: SeekTarget) -> Result<usize, AppError> {
        if !matches!(self.state, ControllerState::Running { .. }) {
            return Err(AppError::InvalidState(format!(
                "cannot seek while {:?}",
                self.state
            )));
        }
        self.pause()?;
        Ok(self.replay.seek(target))
    }

    async fn record(&mut self, spec: CaptureSpec) -> Result<(), AppError> {
        if let Some(error) = self.failure_error() {
            return Err(error);
        }
        self.stop();
        self.wait_until_ready().await?;
        self.drain();

        let capture = self.opener.open(&spec)?;
        self.live.set_capture(capture)?;
        self.live.start_saving()?;
        self.live.resume();
        self.state = ControllerState::Recording;
        info!("Session {} recording from {}", self.session_id, spec);
        Ok(())
    }

    fn on_producer_failed(&mut self, producer: &str, reason: String) {
        if self.failure.is_some() {
            return;
        }
        warn!("Stopping session {}: {} producer failed", self.session_id, producer);
        self.failure = Some((producer.to_string(), reason.clone()));
        if self.state == ControllerState::Initializing {
            // initialize reports the failure itself
            self.pause_producers();
            self.emit(SessionEvent::SessionEnded {
                reason: EndReason::ProducerFailed {
                    producer: producer.to_string(),
                    reason,
                },
            });
            return;
        }
        self.finish(EndReason::ProducerFailed {
            producer: producer.to_string(),
            reason,
        });
    }

    fn on_replay_event(&mut self, event: ProducerEvent<ReplayFrame>) {
        match event {
            ProducerEvent::Ready => self.replay_ready = true,
            ProducerEvent::Output(frame) => {
                if matches!(self.state, ControllerState::Running { .. }) {
                    self.engine.on_replay_frame(frame);
                }
            }
            ProducerEvent::Failed(reason) => {
                let name = self.replay.name().to_string();
                self.on_producer_failed(&name, reason);
            }
        }
    }

    fn on_live_event(&mut self, event: ProducerEvent<LiveOutput>) {
        match event {
            ProducerEvent::Ready => self.live_ready = true,
            ProducerEvent::Output(LiveOutput::Prediction(prediction)) => {
                if matches!(self.state, ControllerState::Running { .. }) {
                    let flow = self.engine.on_live_prediction(prediction);
                    self.apply(flow);
                }
            }
            ProducerEvent::Output(LiveOutput::EndOfStream { take }) => self.on_end_of_stream(take),
            ProducerEvent::Failed(reason) => {
                let name = self.live.name().to_string();
                self.on_producer_failed(&name, reason);
            }
        }
    }

    fn on_end_of_stream(&mut self, take: Option<Take>) {
        info!("Live stream ended");
        if let Some(take) = take {
            self.emit(SessionEvent::TakeRecorded(take));
        }
        match self.state {
            ControllerState::Running { .. } => {
                self.pause_producers();
                self.state = ControllerState::Running { paused: true };
                self.sync_timer();
            }
            ControllerState::Recording => {
                self.live.pause();
                self.state = ControllerState::Stopped;
            }
            _ => {}
        }
        self.emit(SessionEvent::LiveStreamEnded);
    }
}
