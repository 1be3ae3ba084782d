//! Search Drivers

use crate::space::SearchSpace;
use inference_engine::Hyperparameters;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Proposes candidates and learns from their scores
pub trait SearchDriver {
    /// Next candidate to evaluate
    fn suggest(&mut self, space: &SearchSpace) -> Hyperparameters;

    /// Score of an evaluated candidate, lower is better
    fn report(&mut self, candidate: &Hyperparameters, score: f64);

    /// Lowest reported score so far; the earliest report wins ties
    fn best(&self) -> Option<(Hyperparameters, f64)>;
}

/// Independent uniform sampling over the search space
#[derive(Debug, Clone)]
pub struct RandomSearch {
    rng: StdRng,
    best: Option<(Hyperparameters, f64)>,
    reported: usize,
}

impl RandomSearch {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            best: None,
            reported: 0,
        }
    }

    /// Number of scores received
    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl SearchDriver for RandomSearch {
    fn suggest(&mut self, space: &SearchSpace) -> Hyperparameters {
        let (l_min, l_max) = space.layers;
        let layers = self.rng.gen_range(l_min..=l_max.max(l_min));

        let neurons = pick(&mut self.rng, &space.neuron_choices()).unwrap_or(space.neurons.0);
        let dropout = pick(&mut self.rng, &space.dropout_choices()).unwrap_or(space.dropout.0);

        let (lr_min, lr_max) = space.learning_rate;
        let (log_min, log_max) = (lr_min.ln(), lr_max.ln());
        let learning_rate = if log_max > log_min {
            self.rng.gen_range(log_min..=log_max).exp().clamp(lr_min, lr_max)
        } else {
            lr_min
        };

        Hyperparameters {
            layers,
            neurons,
            dropout,
            learning_rate,
        }
    }

    fn report(&mut self, candidate: &Hyperparameters, score: f64) {
        self.reported += 1;
        let score = if score.is_finite() { score } else { f64::INFINITY };
        if self.best.map_or(true, |(_, best)| score < best) {
            self.best = Some((*candidate, score));
        }
    }

    fn best(&self) -> Option<(Hyperparameters, f64)> {
        self.best
    }
}

fn pick<T: Copy>(rng: &mut StdRng, choices: &[T]) -> Option<T> {
    if choices.is_empty() {
        return None;
    }
    Some(choices[rng.gen_range(0..choices.len())])
}
