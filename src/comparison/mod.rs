pub mod deviation;
pub mod engine;
pub mod repetition;
pub mod smoothing;

pub use deviation::{ErrorVector, significant_errors};
pub use engine::{ComparisonEngine, Flow};
pub use repetition::RepetitionContext;
pub use smoothing::BoxFilter;
