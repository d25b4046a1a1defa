use thiserror::Error;
use uuid::Uuid;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },
    #[error("Model {0} is unavailable")]
    ModelUnavailable(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Failed to open capture {name}: {reason}")]
    CaptureOpen { name: String, reason: String },
    #[error("Failed to read capture frame: {0}")]
    CaptureRead(String),
    #[error("Invalid exercise: {0}")]
    InvalidExercise(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Producer {producer} failed: {reason}")]
    ProducerFailed { producer: String, reason: String },
    #[error("Session {0} is no longer running")]
    SessionClosed(Uuid),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Fatal errors end the producer that raised them; everything else only
    /// skips the current iteration.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::ModelLoad { .. }
                | AppError::ModelUnavailable(_)
                | AppError::CaptureOpen { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_producer_errors() {
        assert!(AppError::ModelUnavailable("hmr".into()).is_fatal());
        assert!(AppError::CaptureOpen {
            name: "camera 0".into(),
            reason: "busy".into()
        }
        .is_fatal());
        assert!(!AppError::Inference("nan".into()).is_fatal());
        assert!(!AppError::CaptureRead("truncated".into()).is_fatal());
    }
}
