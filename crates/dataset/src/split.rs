//! Validation Split Policies

use crate::DatasetError;
use doe_table::DoeId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// How validation rows are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMethod {
    /// A fraction of all rows, drawn independently of their experiment
    #[default]
    Random,
    /// Every row of one experiment
    LeaveOneOut,
}

/// Split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default)]
    pub method: ValidationMethod,
    /// Fraction of rows used for validation (`Random` only)
    #[serde(default = "default_validation_split")]
    pub validation_split: f64,
    /// Experiment withheld by `LeaveOneOut`; drawn with `seed` when unset
    #[serde(default)]
    pub holdout: Option<DoeId>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_validation_split() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    42
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            method: ValidationMethod::Random,
            validation_split: default_validation_split(),
            holdout: None,
            seed: default_seed(),
        }
    }
}

impl SplitConfig {
    /// Random row-level holdout
    pub fn random(validation_split: f64) -> Self {
        Self {
            method: ValidationMethod::Random,
            validation_split,
            ..Default::default()
        }
    }

    /// Experiment-level holdout
    pub fn leave_one_out(holdout: Option<DoeId>) -> Self {
        Self {
            method: ValidationMethod::LeaveOneOut,
            holdout,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(DatasetError::Configuration(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        Ok(())
    }

    /// Partition row indices given the owning experiment of each row
    pub fn apply(&self, doe_ids: &[DoeId]) -> Result<Split, DatasetError> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let split = match self.method {
            ValidationMethod::Random => {
                let n = doe_ids.len();
                let n_val = (self.validation_split * n as f64).round() as usize;

                let mut indices: Vec<usize> = (0..n).collect();
                indices.shuffle(&mut rng);

                let mut validation = indices[..n_val].to_vec();
                let mut train = indices[n_val..].to_vec();
                validation.sort_unstable();
                train.sort_unstable();

                Split {
                    method: ValidationMethod::Random,
                    train,
                    validation,
                    held_out: Vec::new(),
                }
            }
            ValidationMethod::LeaveOneOut => {
                let mut seen = HashSet::new();
                let experiments: Vec<DoeId> = doe_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
                if experiments.len() < 2 {
                    return Err(DatasetError::Configuration(
                        "leave-one-out validation needs at least two experiments".to_string(),
                    ));
                }

                let held = match self.holdout {
                    Some(id) if experiments.contains(&id) => id,
                    Some(id) => {
                        return Err(DatasetError::Configuration(format!(
                            "held-out experiment {} is not in the dataset",
                            id
                        )))
                    }
                    None => experiments[rng.gen_range(0..experiments.len())],
                };

                let (validation, train): (Vec<usize>, Vec<usize>) =
                    (0..doe_ids.len()).partition(|&row| doe_ids[row] == held);

                Split {
                    method: ValidationMethod::LeaveOneOut,
                    train,
                    validation,
                    held_out: vec![held],
                }
            }
        };

        debug!(
            "{:?} split: {} training rows, {} validation rows, held out {:?}",
            split.method,
            split.train.len(),
            split.validation.len(),
            split.held_out
        );

        Ok(split)
    }
}

/// Row partition produced by a [`SplitConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub method: ValidationMethod,
    /// Training row indices, ascending
    pub train: Vec<usize>,
    /// Validation row indices, ascending
    pub validation: Vec<usize>,
    /// Experiments withheld entirely (leave-one-out)
    pub held_out: Vec<DoeId>,
}
