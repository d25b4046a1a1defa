use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    capture::{CaptureOpener, CaptureSpec, ImageSequenceOpener},
    comparison::ComparisonEngine,
    config::Configuration,
    error::AppError,
    model::{LiveModel, PoseModel},
    producer::{LiveSource, ProducerThread, ReplaySource},
    progress::{ProgressMode, ProgressState},
    render::{Renderer, TracingRenderer},
    session::{ComparisonController, Producers, SessionHandle},
};

const COMMAND_BUFFER_SIZE: usize = 16;
const EVENT_BUFFER_SIZE: usize = 256;

/// Runs one comparison session: two producer threads plus the session task
/// that consumes their output.
pub struct Coordinator {
    session_task: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
    handle: SessionHandle,
}

struct Collaborators {
    pose_model: Box<dyn PoseModel>,
    live_model: Box<dyn LiveModel>,
    renderer: Box<dyn Renderer>,
    capture_opener: Arc<dyn CaptureOpener>,
    camera: CaptureSpec,
}

impl Coordinator {
    fn start(
        configuration: Configuration,
        collaborators: Collaborators,
    ) -> Result<Self, AppError> {
        let producer_config = &configuration.producer;
        let (replay_tx, replay_rx) = mpsc::channel(producer_config.channel_capacity);
        let (live_tx, live_rx) = mpsc::channel(producer_config.channel_capacity);

        let mut replay = ProducerThread::new(
            "replay",
            producer_config.replay_fps,
            ReplaySource::new(collaborators.pose_model, producer_config.replay_fps),
            replay_tx,
        );
        let mut live = ProducerThread::new(
            "live",
            producer_config.live_fps,
            LiveSource::new(collaborators.live_model),
            live_tx,
        );
        replay.start()?;
        live.start()?;

        let (events, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let engine = ComparisonEngine::new(
            configuration.comparison.clone(),
            ProgressState::from_config(&configuration.progress),
            collaborators.renderer,
            events.clone(),
        );

        let session_id = Uuid::new_v4();
        let controller = ComparisonController::new(
            session_id,
            Producers {
                replay,
                replay_rx,
                live,
                live_rx,
            },
            engine,
            collaborators.capture_opener,
            collaborators.camera,
            command_rx,
            events.clone(),
        );

        let cancel_token = CancellationToken::new();
        let session_task = tokio::spawn(controller.run(cancel_token.clone()));
        debug!("Session {} started", session_id);

        Ok(Self {
            session_task,
            cancel_token,
            handle: SessionHandle::new(session_id, command_tx, events),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Cancels the session and waits for its producers to exit.
    pub async fn shutdown(&mut self) {
        self.cancel_token.cancel();
        if let Err(e) = (&mut self.session_task).await {
            error!("Session task ended abnormally: {}", e);
        }
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    pose_model: Option<Box<dyn PoseModel>>,
    live_model: Option<Box<dyn LiveModel>>,
    renderer: Option<Box<dyn Renderer>>,
    capture_opener: Option<Arc<dyn CaptureOpener>>,
    camera: Option<CaptureSpec>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            pose_model: None,
            live_model: None,
            renderer: None,
            capture_opener: None,
            camera: None,
        }
    }

    // Sets the replay rate, this will override the default configuration.
    pub fn replay_fps(mut self, replay_fps: u32) -> Self {
        self.configuration.producer.replay_fps = replay_fps;
        self
    }

    // Sets the live rate, this will override the default configuration.
    pub fn live_fps(mut self, live_fps: u32) -> Self {
        self.configuration.producer.live_fps = live_fps;
        self
    }

    // Adjusts the producer channel size, this will override the default configuration.
    pub fn channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.configuration.producer.channel_capacity = channel_capacity;
        self
    }

    pub fn progress_mode(mut self, mode: ProgressMode) -> Self {
        self.configuration.progress.mode = mode;
        self
    }

    pub fn pose_model(mut self, model: Box<dyn PoseModel>) -> Self {
        self.pose_model = Some(model);
        self
    }

    pub fn live_model(mut self, model: Box<dyn LiveModel>) -> Self {
        self.live_model = Some(model);
        self
    }

    pub fn renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn capture_opener(mut self, opener: Arc<dyn CaptureOpener>) -> Self {
        self.capture_opener = Some(opener);
        self
    }

    // Defaults to the configured camera index.
    pub fn camera(mut self, camera: CaptureSpec) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Starts the producers and spawns the session task; needs a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let pose_model = self
            .pose_model
            .ok_or(AppError::InvalidConfig("Pose model not set".to_string()))?;
        let live_model = self
            .live_model
            .ok_or(AppError::InvalidConfig("Live model not set".to_string()))?;
        let camera = self
            .camera
            .unwrap_or(CaptureSpec::Camera(self.configuration.capture.camera_index));

        let collaborators = Collaborators {
            pose_model,
            live_model,
            renderer: self.renderer.unwrap_or_else(|| Box::new(TracingRenderer)),
            capture_opener: self
                .capture_opener
                .unwrap_or_else(|| Arc::new(ImageSequenceOpener)),
            camera,
        };
        Coordinator::start(self.configuration, collaborators)
    }
}
