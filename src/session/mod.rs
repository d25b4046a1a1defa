pub mod controller;
pub mod events;
pub mod handle;

pub use controller::{ComparisonController, ControllerState, Producers, SessionStatus};
pub use events::{EndReason, SessionEvent};
pub use handle::{SessionCommand, SessionHandle};
