//! Projection Predictor
//!
//! Two position attributes spanning the projected part surface. Queries are
//! either a regular grid over the observed ranges or explicit points.

use crate::comparison::Comparison;
use crate::error::PredictorError;
use crate::surrogate::Predictor;
use autotune::{AutotuneOutcome, SearchSpace};
use dataset::SplitConfig;
use doe_table::{DesignTable, DoeId, ObservationTable};
use feature_engine::{grid_2d, FeatureSchema, ProcessParameters};
use inference_engine::{Hyperparameters, MlpTrainer, ModelTrainer, TrainSettings, TrainingHistory};
use ndarray::{Array2, ArrayView1};
use serde::Serialize;
use std::path::Path;

/// Where to evaluate the projection model
#[derive(Debug, Clone, PartialEq)]
pub enum PositionQuery {
    /// `count_u x count_v` grid over the observed ranges, `v` varying fastest
    Grid { count_u: usize, count_v: usize },
    /// Raw `(N, 2)` positions
    Points(Array2<f64>),
}

/// Prediction over a set of surface positions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionPrediction {
    /// Raw `(N, 2)` positions
    pub samples: Array2<f64>,
    /// Denormalized `(N, outputs)` values
    pub outputs: Array2<f64>,
    pub position_names: Vec<String>,
    pub output_names: Vec<String>,
    /// `(count_u, count_v)` of a grid query
    pub grid: Option<(usize, usize)>,
}

impl ProjectionPrediction {
    pub fn output(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.output_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.outputs.column(i))
    }

    /// One output reshaped to `(count_u, count_v)`; grid queries only
    pub fn output_grid(&self, name: &str) -> Result<Array2<f64>, PredictorError> {
        let (count_u, count_v) = self
            .grid
            .ok_or_else(|| PredictorError::Configuration("prediction was not made on a grid".to_string()))?;
        let column = self
            .output(name)
            .ok_or_else(|| PredictorError::Configuration(format!("unknown output attribute '{}'", name)))?;

        Array2::from_shape_vec((count_u, count_v), column.to_vec())
            .map_err(|e| PredictorError::Configuration(e.to_string()))
    }

    /// Column table: positions first, then outputs
    pub fn to_table(&self) -> Vec<(String, Vec<f64>)> {
        let positions = self
            .position_names
            .iter()
            .zip(self.samples.columns())
            .map(|(name, column)| (name.clone(), column.to_vec()));
        let outputs = self
            .output_names
            .iter()
            .zip(self.outputs.columns())
            .map(|(name, column)| (name.clone(), column.to_vec()));
        positions.chain(outputs).collect()
    }
}

/// 2D predictor over the shared [`Predictor`] core
pub struct ProjectionPredictor<T: ModelTrainer = MlpTrainer> {
    core: Predictor<T>,
}

impl ProjectionPredictor<MlpTrainer> {
    pub fn new() -> Self {
        Self::with_trainer(MlpTrainer)
    }
}

impl Default for ProjectionPredictor<MlpTrainer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ModelTrainer> ProjectionPredictor<T> {
    pub fn with_trainer(trainer: T) -> Self {
        Self {
            core: Predictor::with_trainer(trainer, 2),
        }
    }

    /// Shared core, for accessors such as `dataset` or `registry`
    pub fn core(&self) -> &Predictor<T> {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut Predictor<T> {
        &mut self.core
    }

    pub fn is_data_loaded(&self) -> bool {
        self.core.is_data_loaded()
    }

    pub fn is_trained(&self) -> bool {
        self.core.is_trained()
    }

    pub fn load_data(
        &mut self,
        design: &DesignTable,
        observations: &ObservationTable,
        schema: FeatureSchema,
        split: SplitConfig,
    ) -> Result<(), PredictorError> {
        self.core.load_data(design, observations, schema, split)
    }

    pub fn train(
        &mut self,
        hyperparameters: &Hyperparameters,
        settings: &TrainSettings,
    ) -> Result<TrainingHistory, PredictorError> {
        self.core.train(hyperparameters, settings)
    }

    pub fn autotune(
        &mut self,
        save_path: &Path,
        trials: usize,
        max_epochs: usize,
        space: SearchSpace,
    ) -> Result<AutotuneOutcome, PredictorError> {
        self.core.autotune(save_path, trials, max_epochs, space)
    }

    pub fn compare(&self, doe_id: DoeId) -> Result<Comparison, PredictorError> {
        self.core.compare(doe_id)
    }

    pub fn save_config(&self, path: &Path) -> Result<(), PredictorError> {
        self.core.save_config(path)
    }

    pub fn load_config(&mut self, path: &Path) -> Result<(), PredictorError> {
        self.core.load_config(path)
    }

    pub fn save_model(&self, path: &Path) -> Result<(), PredictorError> {
        self.core.save_model(path)
    }

    pub fn load_model(&mut self, path: &Path) -> Result<(), PredictorError> {
        self.core.load_model(path)
    }

    pub fn predict(
        &self,
        params: &ProcessParameters,
        query: &PositionQuery,
    ) -> Result<ProjectionPrediction, PredictorError> {
        let registry = &self.core.require_config()?.registry;

        let (samples, grid) = match query {
            PositionQuery::Grid { count_u, count_v } => {
                let [u, v] = match registry.positions() {
                    [u, v] => [u, v],
                    other => {
                        return Err(PredictorError::Configuration(format!(
                            "expected 2 position attributes, got {}",
                            other.len()
                        )))
                    }
                };
                let samples = grid_2d(
                    (u.stats.min, u.stats.max),
                    (v.stats.min, v.stats.max),
                    *count_u,
                    *count_v,
                );
                (samples, Some((*count_u, *count_v)))
            }
            PositionQuery::Points(points) => {
                if points.ncols() != 2 {
                    return Err(PredictorError::Configuration(format!(
                        "positions must have shape (N, 2), got (N, {})",
                        points.ncols()
                    )));
                }
                (points.clone(), None)
            }
        };

        let outputs = self.core.predict_samples(params, samples.view())?;
        Ok(ProjectionPrediction {
            samples,
            outputs,
            position_names: registry.position_names().into_iter().map(String::from).collect(),
            output_names: registry.output_names().into_iter().map(String::from).collect(),
            grid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn prediction() -> ProjectionPrediction {
        ProjectionPrediction {
            samples: array![[0.0, 0.0], [0.0, 10.0], [1.0, 0.0], [1.0, 10.0], [2.0, 0.0], [2.0, 10.0]],
            outputs: array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [5.0, 50.0], [6.0, 60.0]],
            position_names: vec!["x".to_string(), "y".to_string()],
            output_names: vec!["thickness".to_string(), "deviation".to_string()],
            grid: Some((3, 2)),
        }
    }

    #[test]
    fn test_output_grid_is_row_major() {
        let grid = prediction().output_grid("deviation").unwrap();
        assert_eq!(grid, array![[10.0, 20.0], [30.0, 40.0], [50.0, 60.0]]);
        assert!(prediction().output_grid("radius").is_err());
    }

    #[test]
    fn test_output_grid_needs_grid_query() {
        let mut p = prediction();
        p.grid = None;
        assert!(matches!(p.output_grid("thickness"), Err(PredictorError::Configuration(_))));
    }

    #[test]
    fn test_to_table_columns() {
        let table = prediction().to_table();
        let names: Vec<&str> = table.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "thickness", "deviation"]);
        assert_eq!(table[1].1, vec![0.0, 10.0, 0.0, 10.0, 0.0, 10.0]);
        assert_eq!(table[2].1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
