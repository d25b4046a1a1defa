pub mod capture;
pub mod common;
pub mod comparison;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod exercise;
pub mod model;
pub mod producer;
pub mod progress;
pub mod render;
pub mod session;
pub mod sim;

pub use config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::AppError;
pub use exercise::{Exercise, ExerciseLibrary};
pub use session::{EndReason, SessionEvent, SessionHandle};
