//! Training: configuration, loss, and the optimization loop.

mod config;
mod loss;
mod trainer;

pub use config::TrainingConfig;
pub use loss::cross_entropy;
pub use trainer::{train, StopHandle, TrainingResult};
