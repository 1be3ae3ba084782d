//! Hyperparameter Search Space

use crate::AutotuneError;
use inference_engine::Hyperparameters;
use serde::{Deserialize, Serialize};

/// Bounds of every tunable hyperparameter
///
/// `neurons` and `dropout` are `(min, max, step)` grids, `layers` is an
/// inclusive integer range and `learning_rate` is sampled log-uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub layers: (usize, usize),
    pub neurons: (usize, usize, usize),
    pub dropout: (f64, f64, f64),
    pub learning_rate: (f64, f64),
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            layers: (4, 6),
            neurons: (64, 256, 64),
            dropout: (0.0, 0.5, 0.1),
            learning_rate: (1e-5, 1e-3),
        }
    }
}

impl SearchSpace {
    pub fn validate(&self) -> Result<(), AutotuneError> {
        let (l_min, l_max) = self.layers;
        if l_min == 0 || l_min > l_max {
            return Err(invalid("layers", format!("({}, {})", l_min, l_max)));
        }

        let (n_min, n_max, n_step) = self.neurons;
        if n_min == 0 || n_min > n_max || n_step == 0 {
            return Err(invalid("neurons", format!("({}, {}, {})", n_min, n_max, n_step)));
        }

        let (d_min, d_max, d_step) = self.dropout;
        if !(0.0..1.0).contains(&d_min) || !(d_min..1.0).contains(&d_max) || !(d_step > 0.0 && d_step.is_finite()) {
            return Err(invalid("dropout", format!("({}, {}, {})", d_min, d_max, d_step)));
        }

        let (lr_min, lr_max) = self.learning_rate;
        if !(lr_min > 0.0 && lr_min <= lr_max && lr_max.is_finite()) {
            return Err(invalid("learning_rate", format!("({}, {})", lr_min, lr_max)));
        }
        Ok(())
    }

    /// Neuron counts on the grid, ascending
    pub fn neuron_choices(&self) -> Vec<usize> {
        let (min, max, step) = self.neurons;
        (min..=max).step_by(step.max(1)).collect()
    }

    /// Dropout rates on the grid, ascending
    pub fn dropout_choices(&self) -> Vec<f64> {
        let (min, max, step) = self.dropout;
        if step <= 0.0 || max < min {
            return vec![min];
        }
        let n = ((max - min) / step + 1e-9).floor() as usize;
        (0..=n)
            .map(|i| ((min + i as f64 * step) * 1e9).round() / 1e9)
            .collect()
    }

    pub fn contains(&self, candidate: &Hyperparameters) -> bool {
        (self.layers.0..=self.layers.1).contains(&candidate.layers)
            && self.neuron_choices().contains(&candidate.neurons)
            && self
                .dropout_choices()
                .iter()
                .any(|d| (d - candidate.dropout).abs() < 1e-9)
            && (self.learning_rate.0..=self.learning_rate.1).contains(&candidate.learning_rate)
    }
}

fn invalid(name: &str, bounds: String) -> AutotuneError {
    AutotuneError::Configuration(format!("invalid search range for {}: {}", name, bounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grids() {
        let space = SearchSpace::default();
        assert!(space.validate().is_ok());
        assert_eq!(space.neuron_choices(), vec![64, 128, 192, 256]);
        assert_eq!(space.dropout_choices(), vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn test_uneven_step_stops_below_max() {
        let space = SearchSpace {
            neurons: (10, 35, 10),
            dropout: (0.0, 0.25, 0.1),
            ..Default::default()
        };
        assert_eq!(space.neuron_choices(), vec![10, 20, 30]);
        assert_eq!(space.dropout_choices(), vec![0.0, 0.1, 0.2]);
    }

    #[test]
    fn test_invalid_ranges() {
        let cases = [
            SearchSpace {
                layers: (0, 2),
                ..Default::default()
            },
            SearchSpace {
                layers: (5, 4),
                ..Default::default()
            },
            SearchSpace {
                neurons: (64, 256, 0),
                ..Default::default()
            },
            SearchSpace {
                dropout: (0.0, 1.0, 0.1),
                ..Default::default()
            },
            SearchSpace {
                learning_rate: (0.0, 1e-3),
                ..Default::default()
            },
            SearchSpace {
                learning_rate: (1e-2, 1e-3),
                ..Default::default()
            },
        ];
        for space in cases {
            assert!(space.validate().is_err(), "{:?}", space);
        }
    }

    #[test]
    fn test_contains() {
        let space = SearchSpace::default();
        let inside = Hyperparameters {
            layers: 5,
            neurons: 128,
            dropout: 0.3,
            learning_rate: 1e-4,
        };
        assert!(space.contains(&inside));
        assert!(!space.contains(&Hyperparameters { neurons: 100, ..inside }));
        assert!(!space.contains(&Hyperparameters { layers: 3, ..inside }));
    }
}
