//! Model Selection
//!
//! Draws hyperparameter candidates from a bounded search space, trains one
//! model per candidate on the dataset split and keeps the best scoring one.

mod search;
mod space;
mod tuner;

pub use search::{RandomSearch, SearchDriver};
pub use space::SearchSpace;
pub use tuner::{AutotuneOutcome, AutotuneSettings, Autotuner, TrialRecord};

use inference_engine::ModelError;
use thiserror::Error;

/// Autotuning errors
#[derive(Debug, Error)]
pub enum AutotuneError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}
