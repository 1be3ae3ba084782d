//! Ground Truth Comparison

use doe_table::DoeId;
use ndarray::{Array2, Axis};
use serde::Serialize;

/// Prediction next to the measured values of one experiment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub doe_id: DoeId,
    pub position_names: Vec<String>,
    pub output_names: Vec<String>,
    /// Raw positions, `(rows, positions)`
    pub positions: Array2<f64>,
    /// Measured outputs, `(rows, outputs)`
    pub truth: Array2<f64>,
    /// Denormalized prediction, `(rows, outputs)`
    pub prediction: Array2<f64>,
    /// Root mean squared error per output
    pub rmse: Vec<f64>,
    /// Mean absolute error per output
    pub mae: Vec<f64>,
}

impl Comparison {
    pub fn new(
        doe_id: DoeId,
        position_names: Vec<String>,
        output_names: Vec<String>,
        positions: Array2<f64>,
        truth: Array2<f64>,
        prediction: Array2<f64>,
    ) -> Self {
        let diff = &prediction - &truth;
        let (rmse, mae) = if diff.nrows() == 0 {
            (vec![0.0; diff.ncols()], vec![0.0; diff.ncols()])
        } else {
            (
                diff.map_axis(Axis(0), |c| c.mapv(|d| d * d).mean().unwrap_or(0.0).sqrt())
                    .to_vec(),
                diff.map_axis(Axis(0), |c| c.mapv(f64::abs).mean().unwrap_or(0.0))
                    .to_vec(),
            )
        };

        Self {
            doe_id,
            position_names,
            output_names,
            positions,
            truth,
            prediction,
            rmse,
            mae,
        }
    }

    /// Number of compared rows
    pub fn len(&self) -> usize {
        self.truth.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.truth.nrows() == 0
    }

    fn output_index(&self, name: &str) -> Option<usize> {
        self.output_names.iter().position(|n| n == name)
    }

    pub fn rmse_of(&self, output: &str) -> Option<f64> {
        self.output_index(output).map(|i| self.rmse[i])
    }

    pub fn mae_of(&self, output: &str) -> Option<f64> {
        self.output_index(output).map(|i| self.mae[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_error_metrics() {
        let comparison = Comparison::new(
            3,
            vec!["tp".to_string()],
            vec!["radius".to_string(), "thickness".to_string()],
            array![[0.0], [1.0]],
            array![[1.0, 2.0], [1.0, 2.0]],
            array![[4.0, 2.0], [1.0, 1.0]],
        );
        assert_eq!(comparison.len(), 2);
        assert!((comparison.rmse_of("radius").unwrap() - (4.5f64).sqrt()).abs() < 1e-12);
        assert_eq!(comparison.mae_of("radius"), Some(1.5));
        assert_eq!(comparison.mae_of("thickness"), Some(0.5));
        assert_eq!(comparison.rmse_of("deviation"), None);
    }
}
