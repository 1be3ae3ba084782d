//! Column Statistics

use serde::{Deserialize, Serialize};

/// Summary statistics of one continuous attribute
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Mean value
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
}

impl ColumnStats {
    /// Compute statistics from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;

        // Mean
        let mean = values.iter().sum::<f64>() / n;

        // Min/Max
        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        // Population variance
        let m2: f64 = values.iter().map(|&v| (v - mean) * (v - mean)).sum();
        let std = (m2 / n).sqrt();

        Self { mean, std, min, max }
    }

    /// Whether the column carries no information.
    ///
    /// Decided on min/max: the computed std of a constant column can come out
    /// as a tiny positive number through rounding in the mean.
    pub fn is_constant(&self) -> bool {
        self.max <= self.min || self.std <= 0.0
    }

    /// Width of the observed range
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// `(v - mean) / std`
    pub fn standardize(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    /// Inverse of [`ColumnStats::standardize`]
    pub fn destandardize(&self, value: f64) -> f64 {
        self.mean + value * self.std
    }
}
