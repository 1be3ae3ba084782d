//! Autotuning Loop

use crate::search::SearchDriver;
use crate::space::SearchSpace;
use crate::AutotuneError;
use dataset::Dataset;
use inference_engine::{Hyperparameters, ModelError, ModelTrainer, Regressor, TrainSettings, TrainingData};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Autotuning budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutotuneSettings {
    /// Number of candidates evaluated
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Per-trial training settings; `epochs` is the per-trial maximum
    #[serde(default)]
    pub train: TrainSettings,
}

fn default_trials() -> usize {
    10
}

impl Default for AutotuneSettings {
    fn default() -> Self {
        Self {
            trials: default_trials(),
            train: TrainSettings::default(),
        }
    }
}

/// One evaluated candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial: usize,
    pub hyperparameters: Hyperparameters,
    /// Best validation MSE in normalized units, `+inf` if training diverged
    pub score: f64,
    pub epochs: usize,
    pub stopped_early: bool,
}

/// Result of a finished search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutotuneOutcome {
    pub hyperparameters: Hyperparameters,
    pub score: f64,
    /// Index of the winning trial
    pub best_trial: usize,
    pub trials: Vec<TrialRecord>,
}

/// Trains one model per suggested candidate and keeps the best
pub struct Autotuner {
    space: SearchSpace,
    settings: AutotuneSettings,
}

impl Autotuner {
    pub fn new(space: SearchSpace, settings: AutotuneSettings) -> Self {
        Self { space, settings }
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn settings(&self) -> &AutotuneSettings {
        &self.settings
    }

    /// Run the search, persist the winning model to `save_path` and return it
    pub fn run<T, D>(
        &self,
        trainer: &T,
        driver: &mut D,
        dataset: &Dataset,
        save_path: &Path,
    ) -> Result<(AutotuneOutcome, T::Model), AutotuneError>
    where
        T: ModelTrainer,
        D: SearchDriver + ?Sized,
    {
        self.space.validate()?;
        if self.settings.trials == 0 {
            return Err(AutotuneError::Configuration("trials must be positive".to_string()));
        }

        let (train_x, train_y) = (dataset.train_x(), dataset.train_y());
        let (val_x, val_y) = (dataset.validation_x(), dataset.validation_y());
        let data = TrainingData::new(train_x.view(), train_y.view()).with_validation(val_x.view(), val_y.view());

        info!(
            "Autotuning {} trials: {} training rows, {} validation rows",
            self.settings.trials,
            train_x.nrows(),
            val_x.nrows()
        );

        let mut trials = Vec::with_capacity(self.settings.trials);
        let mut best: Option<(usize, f64, T::Model)> = None;
        let mut divergence = None;

        for trial in 0..self.settings.trials {
            let candidate = driver.suggest(&self.space);
            let (model, score, epochs, stopped_early) =
                match trainer.train(data, &candidate, &self.settings.train) {
                    Ok((model, history)) => {
                        let mut score = history.score();
                        if !score.is_finite() {
                            warn!("Trial {} produced no finite loss", trial);
                            score = f64::INFINITY;
                        }
                        (Some(model), score, history.epochs_run(), history.stopped_early)
                    }
                    Err(err @ ModelError::Diverged { epoch }) => {
                        warn!("Trial {} diverged: {}", trial, err);
                        divergence = Some(err);
                        (None, f64::INFINITY, epoch + 1, false)
                    }
                    Err(err) => return Err(err.into()),
                };
            driver.report(&candidate, score);
            metrics::counter!("autotune_trials_total").increment(1);

            debug!(
                "Trial {}: {:?} -> score {:.6} after {} epochs",
                trial, candidate, score, epochs
            );

            trials.push(TrialRecord {
                trial,
                hyperparameters: candidate,
                score,
                epochs,
                stopped_early,
            });

            if let Some(model) = model {
                if best.as_ref().map_or(true, |(_, b, _)| score < *b) {
                    best = Some((trial, score, model));
                }
            }
        }

        let (best_trial, score, model) = match (best, divergence) {
            (Some(best), _) => best,
            (None, Some(err)) => return Err(err.into()),
            (None, None) => return Err(AutotuneError::Configuration("no trial completed".to_string())),
        };
        model.save(save_path)?;
        metrics::gauge!("autotune_best_score").set(score);

        let hyperparameters = trials[best_trial].hyperparameters;
        info!(
            "Autotune finished: best trial {} of {}, score {:.6}, {:?}",
            best_trial,
            trials.len(),
            score,
            hyperparameters.as_map()
        );

        Ok((
            AutotuneOutcome {
                hyperparameters,
                score,
                best_trial,
                trials,
            },
            model,
        ))
    }
}
