use serde::Serialize;
use uuid::Uuid;

use crate::producer::Take;
use crate::progress::ProgressMode;

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    Stopped,
    TargetReached,
    TimerExpired,
    ProducerFailed { producer: String, reason: String },
}

/// Status stream published by the session task.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        session_id: Uuid,
        exercise: String,
        frames: usize,
    },
    RepetitionStarted {
        repetition: u32,
    },
    RepetitionCompleted {
        repetition: u32,
        mse: Option<f32>,
        correct: bool,
    },
    ProgressChanged {
        mode: ProgressMode,
        counter: u32,
    },
    TakeRecorded(Take),
    LiveStreamEnded,
    SessionEnded {
        reason: EndReason,
    },
}
