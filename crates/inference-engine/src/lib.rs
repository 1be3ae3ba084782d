//! Regression Model Engine
//!
//! Defines the interface between the data pipeline and a trainable
//! function approximator, and ships a plain feed-forward network trained
//! with Adam on mean squared error.

mod batcher;
mod checkpoint;
mod mlp;
mod model;

pub use batcher::Batcher;
pub use checkpoint::{load_checkpoint, save_checkpoint, Checkpoint};
pub use mlp::{Mlp, MlpTrainer};
pub use model::{mse, Hyperparameters, ModelTrainer, Regressor, TrainSettings, TrainingData, TrainingHistory};

use std::path::PathBuf;
use thiserror::Error;

/// Errors during training, inference or model persistence
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Invalid hyperparameters: {0}")]
    InvalidHyperparameters(String),
    #[error("Training failed: {0}")]
    TrainingFailed(String),
    #[error("Training diverged at epoch {epoch} before reaching a finite loss")]
    Diverged { epoch: usize },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Model serialization failed: {0}")]
    Serialization(String),
}
