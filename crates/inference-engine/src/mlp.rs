//! Feed-forward Network
//!
//! Dense ReLU layers with optional dropout and a linear output layer,
//! trained with Adam on mean squared error. Training keeps the weights of
//! the epoch with the lowest monitored loss and stops once that loss has
//! not improved for `patience` epochs.

use crate::batcher::Batcher;
use crate::checkpoint::{load_checkpoint, save_checkpoint};
use crate::model::{mse, Hyperparameters, ModelTrainer, Regressor, TrainSettings, TrainingData, TrainingHistory};
use crate::ModelError;
use ndarray::{s, Array1, Array2, ArrayView2, Axis, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// Fully connected layer
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Dense {
    /// `(inputs, outputs)`
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl Dense {
    /// He-uniform initialization
    fn new<R: Rng>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let limit = (6.0 / inputs as f64).sqrt();
        Self {
            weights: Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..limit)),
            bias: Array1::zeros(outputs),
        }
    }

    fn forward(&self, x: ArrayView2<f64>) -> Array2<f64> {
        x.dot(&self.weights) + &self.bias
    }
}

/// Adam first and second moments of one layer
struct Moments {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

struct Adam {
    learning_rate: f64,
    step: i32,
    first: Vec<Moments>,
    second: Vec<Moments>,
}

impl Adam {
    fn new(layers: &[Dense], learning_rate: f64) -> Self {
        let zeros = || -> Vec<Moments> {
            layers
                .iter()
                .map(|l| Moments {
                    weights: Array2::zeros(l.weights.dim()),
                    bias: Array1::zeros(l.bias.len()),
                })
                .collect()
        };
        Self {
            learning_rate,
            step: 0,
            first: zeros(),
            second: zeros(),
        }
    }

    fn update(&mut self, layers: &mut [Dense], gradients: &[(Array2<f64>, Array1<f64>)]) {
        self.step += 1;
        let correction1 = 1.0 - BETA1.powi(self.step);
        let correction2 = 1.0 - BETA2.powi(self.step);
        let rate = self.learning_rate * correction2.sqrt() / correction1;

        for (i, (layer, (gw, gb))) in layers.iter_mut().zip(gradients).enumerate() {
            let (m, v) = (&mut self.first[i], &mut self.second[i]);

            Zip::from(&mut layer.weights)
                .and(&mut m.weights)
                .and(&mut v.weights)
                .and(gw)
                .for_each(|w, m, v, &g| {
                    *m = BETA1 * *m + (1.0 - BETA1) * g;
                    *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                    *w -= rate * *m / (v.sqrt() + EPSILON);
                });

            Zip::from(&mut layer.bias)
                .and(&mut m.bias)
                .and(&mut v.bias)
                .and(gb)
                .for_each(|b, m, v, &g| {
                    *m = BETA1 * *m + (1.0 - BETA1) * g;
                    *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                    *b -= rate * *m / (v.sqrt() + EPSILON);
                });
        }
    }
}

/// Multi-layer perceptron regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Dense>,
    hyperparameters: Hyperparameters,
    input_width: usize,
    output_width: usize,
}

impl Mlp {
    /// Randomly initialized network
    pub fn new<R: Rng>(input_width: usize, output_width: usize, hyperparameters: &Hyperparameters, rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(hyperparameters.layers + 1);
        let mut inputs = input_width;
        for _ in 0..hyperparameters.layers {
            layers.push(Dense::new(inputs, hyperparameters.neurons, rng));
            inputs = hyperparameters.neurons;
        }
        layers.push(Dense::new(inputs, output_width, rng));

        Self {
            layers,
            hyperparameters: *hyperparameters,
            input_width,
            output_width,
        }
    }

    /// Hyperparameters the network was built with
    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    /// Number of trainable weights
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.weights.len() + l.bias.len()).sum()
    }

    /// Inference pass, dropout disabled
    fn forward(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let last = self.layers.len().saturating_sub(1);
        let mut a = x.to_owned();
        for (i, layer) in self.layers.iter().enumerate() {
            a = layer.forward(a.view());
            if i < last {
                a.mapv_inplace(|v| v.max(0.0));
            }
        }
        a
    }

    /// One optimizer step on a mini-batch; returns the batch loss
    fn train_step<R: Rng>(&mut self, adam: &mut Adam, x: ArrayView2<f64>, y: ArrayView2<f64>, rng: &mut R) -> f64 {
        let hidden = self.layers.len() - 1;
        let dropout = self.hyperparameters.dropout;

        // Forward, keeping what backprop needs
        let mut inputs: Vec<Array2<f64>> = Vec::with_capacity(self.layers.len());
        let mut pre_activations: Vec<Array2<f64>> = Vec::with_capacity(hidden);
        let mut masks: Vec<Option<Array2<f64>>> = Vec::with_capacity(hidden);

        let mut a = x.to_owned();
        for layer in &self.layers[..hidden] {
            let z = layer.forward(a.view());
            let mut h = z.mapv(|v| v.max(0.0));
            let mask = if dropout > 0.0 {
                let keep = 1.0 - dropout;
                let mask = Array2::from_shape_fn(h.dim(), |_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 });
                h *= &mask;
                Some(mask)
            } else {
                None
            };
            inputs.push(a);
            pre_activations.push(z);
            masks.push(mask);
            a = h;
        }
        let output = self.layers[hidden].forward(a.view());
        inputs.push(a);

        let diff = &output - &y;
        let loss = diff.mapv(|d| d * d).mean().unwrap_or(0.0);

        // Backward
        let mut grad = diff * (2.0 / output.len() as f64);
        let mut gradients = Vec::with_capacity(self.layers.len());
        for l in (0..self.layers.len()).rev() {
            if l < hidden {
                if let Some(mask) = &masks[l] {
                    grad *= mask;
                }
                grad.zip_mut_with(&pre_activations[l], |g, &z| {
                    if z <= 0.0 {
                        *g = 0.0;
                    }
                });
            }
            let gw = inputs[l].t().dot(&grad);
            let gb = grad.sum_axis(Axis(0));
            if l > 0 {
                grad = grad.dot(&self.layers[l].weights.t());
            }
            gradients.push((gw, gb));
        }
        gradients.reverse();

        adam.update(&mut self.layers, &gradients);
        loss
    }
}

impl Regressor for Mlp {
    fn input_width(&self) -> usize {
        self.input_width
    }

    fn output_width(&self) -> usize {
        self.output_width
    }

    fn predict(&self, x: ArrayView2<f64>, batch_size: usize) -> Result<Array2<f64>, ModelError> {
        if x.ncols() != self.input_width {
            return Err(ModelError::InvalidInputShape {
                expected: format!("(N, {})", self.input_width),
                actual: format!("(N, {})", x.ncols()),
            });
        }

        let mut y = Array2::zeros((x.nrows(), self.output_width));
        for range in Batcher::new(batch_size).ranges(x.nrows()) {
            let batch = self.forward(x.slice(s![range.clone(), ..]));
            y.slice_mut(s![range, ..]).assign(&batch);
        }
        Ok(y)
    }

    fn save(&self, path: &Path) -> Result<(), ModelError> {
        save_checkpoint(self, path)
    }
}

/// Trains [`Mlp`] models
#[derive(Debug, Clone, Copy, Default)]
pub struct MlpTrainer;

impl ModelTrainer for MlpTrainer {
    type Model = Mlp;

    fn train(
        &self,
        data: TrainingData<'_>,
        hyperparameters: &Hyperparameters,
        settings: &TrainSettings,
    ) -> Result<(Mlp, TrainingHistory), ModelError> {
        data.validate()?;
        hyperparameters.validate()?;
        if settings.epochs == 0 {
            return Err(ModelError::TrainingFailed("epochs must be positive".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(settings.seed);
        let mut model = Mlp::new(data.x.ncols(), data.y.ncols(), hyperparameters, &mut rng);
        let mut adam = Adam::new(&model.layers, hyperparameters.learning_rate);
        let batcher = Batcher::new(settings.batch_size);
        let n = data.x.nrows();

        debug!(
            "Training MLP {}x{} (dropout {}, lr {:e}), {} parameters, {} rows",
            hyperparameters.layers,
            hyperparameters.neurons,
            hyperparameters.dropout,
            hyperparameters.learning_rate,
            model.parameter_count(),
            n
        );

        let mut history = TrainingHistory::default();
        let mut best: Option<(f64, Vec<Dense>)> = None;
        let mut since_best = 0;

        for epoch in 0..settings.epochs {
            let mut total = 0.0;
            for batch in batcher.shuffled(n, &mut rng) {
                let bx = data.x.select(Axis(0), &batch);
                let by = data.y.select(Axis(0), &batch);
                total += model.train_step(&mut adam, bx.view(), by.view(), &mut rng) * batch.len() as f64;
            }
            let train_loss = total / n as f64;
            history.train_loss.push(train_loss);

            let monitored = match data.validation {
                Some((vx, vy)) => {
                    let loss = mse(model.forward(vx).view(), vy);
                    history.val_loss.push(loss);
                    loss
                }
                None => train_loss,
            };

            if !monitored.is_finite() {
                warn!("Training diverged at epoch {}", epoch);
                break;
            }

            let improved = best
                .as_ref()
                .map_or(true, |(b, _)| monitored < b - settings.min_delta);
            if improved {
                best = Some((monitored, model.layers.clone()));
                history.best_epoch = epoch;
                since_best = 0;
            } else {
                since_best += 1;
                if since_best >= settings.patience {
                    debug!("Early stopping at epoch {} (best epoch {})", epoch, history.best_epoch);
                    history.stopped_early = true;
                    break;
                }
            }
        }

        match best {
            Some((_, layers)) => model.layers = layers,
            None => {
                return Err(ModelError::Diverged {
                    epoch: history.epochs_run().saturating_sub(1),
                })
            }
        }

        info!(
            "MLP trained: {} epochs, best epoch {}, score {:.6}",
            history.epochs_run(),
            history.best_epoch,
            history.score()
        );

        Ok((model, history))
    }

    fn load(&self, path: &Path) -> Result<Mlp, ModelError> {
        let model: Mlp = load_checkpoint(path)?.model;
        if model.layers.is_empty() {
            return Err(ModelError::Serialization("checkpoint holds no layers".to_string()));
        }
        Ok(model)
    }
}
