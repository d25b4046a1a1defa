pub mod gate;
pub mod live_source;
pub mod producer_thread;
pub mod replay_source;

pub use gate::PauseGate;
pub use live_source::{LiveOutput, LiveSource, Take};
pub use producer_thread::{ProducerEvent, ProducerState, ProducerThread, Step, Workload};
pub use replay_source::{ReplaySource, SeekTarget};
