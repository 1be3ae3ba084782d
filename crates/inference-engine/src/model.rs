//! Model Interface

use crate::ModelError;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Network topology and optimizer settings explored by autotuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Number of hidden layers
    pub layers: usize,
    /// Units per hidden layer
    pub neurons: usize,
    /// Dropout rate after each hidden layer
    pub dropout: f64,
    /// Adam learning rate
    pub learning_rate: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            layers: 3,
            neurons: 64,
            dropout: 0.0,
            learning_rate: 1e-3,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.layers == 0 || self.neurons == 0 {
            return Err(ModelError::InvalidHyperparameters(format!(
                "layers and neurons must be positive, got {} x {}",
                self.layers, self.neurons
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidHyperparameters(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ModelError::InvalidHyperparameters(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    /// Plain name → value mapping
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("layers".to_string(), self.layers as f64),
            ("neurons".to_string(), self.neurons as f64),
            ("dropout".to_string(), self.dropout),
            ("learning_rate".to_string(), self.learning_rate),
        ])
    }
}

/// Training loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainSettings {
    /// Maximum number of epochs
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Epochs without validation improvement before stopping
    #[serde(default = "default_patience")]
    pub patience: usize,
    /// Smallest loss decrease counted as an improvement
    #[serde(default)]
    pub min_delta: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_epochs() -> usize {
    50
}

fn default_batch_size() -> usize {
    1024
}

fn default_patience() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            patience: default_patience(),
            min_delta: 0.0,
            seed: default_seed(),
        }
    }
}

/// Training matrices handed to a trainer
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    pub x: ArrayView2<'a, f64>,
    pub y: ArrayView2<'a, f64>,
    /// Validation features and targets, if any
    pub validation: Option<(ArrayView2<'a, f64>, ArrayView2<'a, f64>)>,
}

impl<'a> TrainingData<'a> {
    pub fn new(x: ArrayView2<'a, f64>, y: ArrayView2<'a, f64>) -> Self {
        Self {
            x,
            y,
            validation: None,
        }
    }

    pub fn with_validation(mut self, x: ArrayView2<'a, f64>, y: ArrayView2<'a, f64>) -> Self {
        if x.nrows() > 0 {
            self.validation = Some((x, y));
        }
        self
    }

    /// Check matrix shapes agree
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.x.nrows() == 0 {
            return Err(ModelError::TrainingFailed("training set is empty".to_string()));
        }
        if self.x.nrows() != self.y.nrows() {
            return Err(ModelError::InvalidInputShape {
                expected: format!("{} target rows", self.x.nrows()),
                actual: format!("{} target rows", self.y.nrows()),
            });
        }
        if let Some((vx, vy)) = &self.validation {
            if vx.ncols() != self.x.ncols() || vy.ncols() != self.y.ncols() || vx.nrows() != vy.nrows() {
                return Err(ModelError::InvalidInputShape {
                    expected: format!("({}, {}) validation columns", self.x.ncols(), self.y.ncols()),
                    actual: format!("({}, {})", vx.ncols(), vy.ncols()),
                });
            }
        }
        Ok(())
    }
}

/// Per-epoch losses of one training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_loss: Vec<f64>,
    pub val_loss: Vec<f64>,
    /// Epoch whose weights were kept (0-based)
    pub best_epoch: usize,
    pub stopped_early: bool,
}

impl TrainingHistory {
    /// Best validation loss, or best training loss without validation data.
    ///
    /// Non-finite losses score as `+inf`.
    pub fn score(&self) -> f64 {
        let losses = if self.val_loss.is_empty() {
            &self.train_loss
        } else {
            &self.val_loss
        };
        losses
            .iter()
            .copied()
            .filter(|l| l.is_finite())
            .fold(f64::INFINITY, f64::min)
    }

    pub fn epochs_run(&self) -> usize {
        self.train_loss.len()
    }
}

/// A trained model
pub trait Regressor {
    /// Expected feature width
    fn input_width(&self) -> usize;

    /// Produced target width
    fn output_width(&self) -> usize;

    /// Predict `(N, outputs)` for `(N, inputs)`, in chunks of `batch_size` rows
    fn predict(&self, x: ArrayView2<f64>, batch_size: usize) -> Result<Array2<f64>, ModelError>;

    /// Persist the model
    fn save(&self, path: &Path) -> Result<(), ModelError>;
}

/// Produces trained models and restores persisted ones
pub trait ModelTrainer {
    type Model: Regressor;

    /// Train a fresh model
    fn train(
        &self,
        data: TrainingData<'_>,
        hyperparameters: &Hyperparameters,
        settings: &TrainSettings,
    ) -> Result<(Self::Model, TrainingHistory), ModelError>;

    /// Restore a model written by [`Regressor::save`]
    fn load(&self, path: &Path) -> Result<Self::Model, ModelError>;
}

/// Mean squared error over every element
pub fn mse(prediction: ArrayView2<f64>, target: ArrayView2<f64>) -> f64 {
    if prediction.is_empty() {
        return 0.0;
    }
    let diff = &prediction - &target;
    diff.mapv(|d| d * d).mean().unwrap_or(f64::INFINITY)
}
