use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use super::controller::SessionStatus;
use super::events::SessionEvent;
use crate::capture::CaptureSpec;
use crate::error::AppError;
use crate::exercise::Exercise;
use crate::producer::SeekTarget;
use crate::progress::ProgressMode;

pub enum SessionCommand {
    Initialize {
        exercise: Exercise,
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    Pause {
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    Resume {
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    Stop {
        responder: oneshot::Sender<()>,
    },
    Seek {
        target: SeekTarget,
        responder: oneshot::Sender<Result<usize, AppError>>,
    },
    Record {
        spec: CaptureSpec,
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    SetProgressMode {
        mode: ProgressMode,
        responder: oneshot::Sender<()>,
    },
    Status {
        responder: oneshot::Sender<SessionStatus>,
    },
}

/// Cloneable control surface of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    command_tx: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub fn new(
        session_id: Uuid,
        command_tx: mpsc::Sender<SessionCommand>,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            session_id,
            command_tx,
            events,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, AppError> {
        let (responder, response_rx) = oneshot::channel();
        self.command_tx
            .send(command(responder))
            .await
            .map_err(|_| AppError::SessionClosed(self.session_id))?;
        response_rx
            .await
            .map_err(|_| AppError::SessionClosed(self.session_id))
    }

    pub async fn initialize(&self, exercise: Exercise) -> Result<(), AppError> {
        debug!("Initializing session with {}", exercise.name());
        self.request(|responder| SessionCommand::Initialize {
            exercise,
            responder,
        })
        .await?
    }

    pub async fn pause(&self) -> Result<(), AppError> {
        self.request(|responder| SessionCommand::Pause { responder })
            .await?
    }

    pub async fn resume(&self) -> Result<(), AppError> {
        self.request(|responder| SessionCommand::Resume { responder })
            .await?
    }

    pub async fn stop(&self) -> Result<(), AppError> {
        self.request(|responder| SessionCommand::Stop { responder })
            .await
    }

    /// Moves the replay and renders the frame there. Returns the frame index.
    pub async fn seek(&self, target: SeekTarget) -> Result<usize, AppError> {
        self.request(|responder| SessionCommand::Seek { target, responder })
            .await?
    }

    /// Records a take from `spec`; it arrives as [`SessionEvent::TakeRecorded`].
    pub async fn record(&self, spec: CaptureSpec) -> Result<(), AppError> {
        self.request(|responder| SessionCommand::Record { spec, responder })
            .await?
    }

    pub async fn set_progress_mode(&self, mode: ProgressMode) -> Result<(), AppError> {
        self.request(|responder| SessionCommand::SetProgressMode { mode, responder })
            .await
    }

    pub async fn status(&self) -> Result<SessionStatus, AppError> {
        self.request(|responder| SessionCommand::Status { responder })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_session_reports_its_id() {
        let (command_tx, command_rx) = mpsc::channel(1);
        let (events, _) = broadcast::channel(1);
        let handle = SessionHandle::new(Uuid::new_v4(), command_tx, events);
        drop(command_rx);

        match handle.pause().await {
            Err(AppError::SessionClosed(id)) => assert_eq!(id, handle.session_id()),
            other => panic!("expected a closed session, got {:?}", other),
        }
    }
}
