use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use mirror_coach::capture::CaptureSpec;
use mirror_coach::sim::{
    LinearPoseModel, MirrorLiveModel, SyntheticCaptureOpener, demo_exercise,
};
use mirror_coach::{AppError, Configuration, CoordinatorBuilder, ExerciseLibrary, SessionEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, info, warn};

const DEMO_FRAMES: usize = 100;

fn init_logging(level: &str) {
    let level = Level::from_str(level).unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let configuration = Configuration::load(path.as_deref())?;
    init_logging(&configuration.logging.level);

    let mut library = ExerciseLibrary::new(configuration.exercise.smoothing_window);
    library.insert(demo_exercise("arm_circles", DEMO_FRAMES)?);
    let exercise = library
        .get("arm_circles")
        .cloned()
        .ok_or_else(|| AppError::InvalidExercise("arm_circles missing".to_string()))?;

    let camera = CaptureSpec::Camera(configuration.capture.camera_index);
    let mut coordinator = CoordinatorBuilder::new(configuration)
        .pose_model(Box::new(LinearPoseModel::new()))
        .live_model(Box::new(MirrorLiveModel::new(exercise.clone()).with_noise(0.05)))
        .capture_opener(Arc::new(SyntheticCaptureOpener::default()))
        .camera(camera)
        .build()?;

    let handle = coordinator.handle();
    let mut events = handle.subscribe();
    handle.initialize(exercise).await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::SessionEnded { reason }) => {
                    info!("Session ended: {:?}", reason);
                    break;
                }
                Ok(SessionEvent::RepetitionCompleted { repetition, mse, correct }) => {
                    info!("Repetition {} mse {:?} correct {}", repetition, mse, correct);
                }
                Ok(event) => info!("{:?}", event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {} session events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping session");
                handle.stop().await?;
            }
        }
    }

    coordinator.shutdown().await;
    Ok(())
}
