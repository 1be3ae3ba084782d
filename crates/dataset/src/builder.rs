//! Feature and Target Matrix Assembly

use crate::split::{Split, SplitConfig};
use crate::DatasetError;
use doe_table::{DesignTable, DoeId, ObservationTable, TableValidator};
use feature_engine::{AttributeRegistry, FeatureEncoder, OutputScaler};
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Encoded training data plus the raw values it came from
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Encoded features, one row per observation
    x: Array2<f64>,
    /// Normalized targets
    y: Array2<f64>,
    /// Raw position values
    positions: Array2<f64>,
    /// Raw output values
    outputs: Array2<f64>,
    /// Owning experiment of each row
    doe_ids: Vec<DoeId>,
    split: Split,
}

impl Dataset {
    /// Number of rows
    pub fn len(&self) -> usize {
        self.doe_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doe_ids.is_empty()
    }

    /// Full feature matrix
    pub fn features(&self) -> &Array2<f64> {
        &self.x
    }

    /// Full normalized target matrix
    pub fn targets(&self) -> &Array2<f64> {
        &self.y
    }

    /// Raw positions, `(N, positions)`
    pub fn raw_positions(&self) -> &Array2<f64> {
        &self.positions
    }

    /// Raw outputs, `(N, outputs)`
    pub fn raw_outputs(&self) -> &Array2<f64> {
        &self.outputs
    }

    /// Owning experiment of each row
    pub fn doe_ids(&self) -> &[DoeId] {
        &self.doe_ids
    }

    /// Distinct experiments in order of first appearance
    pub fn experiments(&self) -> Vec<DoeId> {
        let mut seen = HashSet::new();
        self.doe_ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    }

    pub fn contains(&self, id: DoeId) -> bool {
        self.doe_ids.contains(&id)
    }

    /// Row indices of one experiment, in observation order
    pub fn rows_for(&self, id: DoeId) -> Vec<usize> {
        self.doe_ids
            .iter()
            .enumerate()
            .filter(|(_, &x)| x == id)
            .map(|(row, _)| row)
            .collect()
    }

    /// Training/validation partition
    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn train_x(&self) -> Array2<f64> {
        self.x.select(Axis(0), &self.split.train)
    }

    pub fn train_y(&self) -> Array2<f64> {
        self.y.select(Axis(0), &self.split.train)
    }

    pub fn validation_x(&self) -> Array2<f64> {
        self.x.select(Axis(0), &self.split.validation)
    }

    pub fn validation_y(&self) -> Array2<f64> {
        self.y.select(Axis(0), &self.split.validation)
    }
}

/// Builds a [`Dataset`] with one registry's encoder and scaler
pub struct DatasetBuilder<'a> {
    registry: &'a AttributeRegistry,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(registry: &'a AttributeRegistry) -> Self {
        Self { registry }
    }

    /// Expand, encode and split the observation rows
    pub fn build(
        &self,
        design: &DesignTable,
        observations: &ObservationTable,
        split: &SplitConfig,
    ) -> Result<Dataset, DatasetError> {
        split.validate()?;

        let index = self.registry.index();
        if design.index_name() != index || observations.index_name() != index {
            return Err(DatasetError::Configuration(format!(
                "tables are keyed by '{}'/'{}', registry expects '{}'",
                design.index_name(),
                observations.index_name(),
                index
            )));
        }

        let validator = TableValidator::new(design, observations);
        validator.validate_join()?;

        let position_names = self.registry.position_names();
        let output_names = self.registry.output_names();
        validator.require_observation_columns(position_names.iter().chain(&output_names).copied())?;

        let n = observations.len();
        let positions = column_matrix(observations, &position_names)?;
        let outputs = column_matrix(observations, &output_names)?;

        let encoder = FeatureEncoder::new(self.registry);
        let scaler = OutputScaler::new(self.registry);

        // Process parameters are constant per experiment: encode once
        let mut prefixes: HashMap<DoeId, Vec<f64>> = HashMap::new();
        for &id in observations.ids() {
            if !prefixes.contains_key(&id) {
                prefixes.insert(id, encoder.encode_experiment(design, id)?);
            }
        }

        let width = encoder.width();
        let mut x = Array2::zeros((n, width));
        let mut features = Vec::with_capacity(width);
        for (row, &id) in observations.ids().iter().enumerate() {
            features.clear();
            features.extend_from_slice(&prefixes[&id]);
            encoder.push_positions(&positions.row(row).to_vec(), &mut features)?;
            x.row_mut(row).assign(&ArrayView1::from(&features[..]));
        }

        let y = scaler.normalize_rows(outputs.view())?;
        let doe_ids = observations.ids().to_vec();
        let split = split.apply(&doe_ids)?;

        info!(
            "Dataset built: {} rows from {} experiments, {} features, {} outputs ({} train / {} validation)",
            n,
            prefixes.len(),
            x.ncols(),
            y.ncols(),
            split.train.len(),
            split.validation.len()
        );

        Ok(Dataset {
            x,
            y,
            positions,
            outputs,
            doe_ids,
            split,
        })
    }
}

fn column_matrix(observations: &ObservationTable, names: &[&str]) -> Result<Array2<f64>, DatasetError> {
    let mut matrix = Array2::zeros((observations.len(), names.len()));
    for (j, name) in names.iter().enumerate() {
        let column = observations
            .column(name)
            .ok_or_else(|| DatasetError::Configuration(format!("missing column '{}'", name)))?;
        for (i, &v) in column.iter().enumerate() {
            matrix[[i, j]] = v;
        }
    }
    Ok(matrix)
}
