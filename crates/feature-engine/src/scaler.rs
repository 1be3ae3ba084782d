//! Position and Output Scaling

use crate::error::FeatureError;
use crate::registry::AttributeRegistry;
use crate::schema::PositionScaler;
use crate::statistics::ColumnStats;
use ndarray::{Array2, ArrayView2, Axis};

impl PositionScaler {
    /// Scale a raw position value
    pub fn scale(&self, stats: &ColumnStats, value: f64) -> f64 {
        match self {
            PositionScaler::Normal => stats.standardize(value),
            PositionScaler::MinMax => (value - stats.min) / stats.range(),
        }
    }
}

/// Maps raw outputs to training targets and back.
///
/// Outputs always use `(x - mean) / std`, independently per attribute.
pub struct OutputScaler<'a> {
    registry: &'a AttributeRegistry,
}

impl<'a> OutputScaler<'a> {
    pub fn new(registry: &'a AttributeRegistry) -> Self {
        Self { registry }
    }

    fn stats(&self, attr: &str) -> Result<&'a ColumnStats, FeatureError> {
        self.registry
            .outputs()
            .iter()
            .find(|o| o.name == attr)
            .map(|o| &o.stats)
            .ok_or_else(|| FeatureError::Configuration(format!("unknown output attribute '{}'", attr)))
    }

    /// Normalize one raw output value
    pub fn normalize(&self, value: f64, attr: &str) -> Result<f64, FeatureError> {
        Ok(self.stats(attr)?.standardize(value))
    }

    /// Bring one model output back to physical units
    pub fn denormalize(&self, value: f64, attr: &str) -> Result<f64, FeatureError> {
        Ok(self.stats(attr)?.destandardize(value))
    }

    /// Normalize an `(N, outputs)` matrix column by column
    pub fn normalize_rows(&self, raw: ArrayView2<f64>) -> Result<Array2<f64>, FeatureError> {
        self.map_columns(raw, ColumnStats::standardize)
    }

    /// Denormalize an `(N, outputs)` matrix column by column
    pub fn denormalize_rows(&self, normalized: ArrayView2<f64>) -> Result<Array2<f64>, FeatureError> {
        self.map_columns(normalized, ColumnStats::destandardize)
    }

    fn map_columns(
        &self,
        values: ArrayView2<f64>,
        f: fn(&ColumnStats, f64) -> f64,
    ) -> Result<Array2<f64>, FeatureError> {
        let outputs = self.registry.outputs();
        if values.ncols() != outputs.len() {
            return Err(FeatureError::Configuration(format!(
                "expected {} output columns, got {}",
                outputs.len(),
                values.ncols()
            )));
        }

        let mut result = values.to_owned();
        for (mut column, entry) in result.axis_iter_mut(Axis(1)).zip(outputs) {
            column.mapv_inplace(|v| f(&entry.stats, v));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FeatureSchema, PositionAttribute};
    use doe_table::{DesignTable, ObservationTable};
    use ndarray::array;
    use proptest::prelude::*;

    fn registry() -> AttributeRegistry {
        let design = DesignTable::new("doe_id", vec![1, 2])
            .unwrap()
            .with_column("Blechdicke", vec![1.0, 2.0])
            .unwrap();
        let observations = ObservationTable::new("doe_id", vec![1, 1, 2, 2])
            .with_column("xp", vec![0.0, 4.0, 0.0, 4.0])
            .unwrap()
            .with_column("deviation", vec![-2.0, 0.0, 1.0, 5.0])
            .unwrap()
            .with_column("thickness", vec![0.9, 1.0, 1.1, 1.2])
            .unwrap();
        let schema = FeatureSchema::new("doe_id")
            .continuous("Blechdicke")
            .position(PositionAttribute::new("xp"))
            .output("deviation")
            .output("thickness");
        AttributeRegistry::build(&schema, &design, &observations).unwrap()
    }

    #[test]
    fn test_minmax_position_scaling() {
        let stats = ColumnStats::compute(&[0.0, 4.0]);
        assert_eq!(PositionScaler::MinMax.scale(&stats, 0.0), 0.0);
        assert_eq!(PositionScaler::MinMax.scale(&stats, 2.0), 0.5);
        assert_eq!(PositionScaler::MinMax.scale(&stats, 4.0), 1.0);
    }

    #[test]
    fn test_normal_position_scaling() {
        let stats = ColumnStats::compute(&[0.0, 4.0]);
        assert_eq!(PositionScaler::Normal.scale(&stats, 2.0), 0.0);
        assert_eq!(PositionScaler::Normal.scale(&stats, 4.0), 1.0);
    }

    #[test]
    fn test_unknown_output() {
        let registry = registry();
        let scaler = OutputScaler::new(&registry);
        assert!(scaler.normalize(1.0, "c_rho").is_err());
    }

    #[test]
    fn test_rows_round_trip() {
        let registry = registry();
        let scaler = OutputScaler::new(&registry);
        let raw = array![[-2.0, 0.9], [5.0, 1.2], [0.0, 0.0]];
        let normalized = scaler.normalize_rows(raw.view()).unwrap();
        assert!((normalized[[0, 0]] - scaler.normalize(-2.0, "deviation").unwrap()).abs() < 1e-12);
        assert!((normalized[[1, 1]] - scaler.normalize(1.2, "thickness").unwrap()).abs() < 1e-12);

        let back = scaler.denormalize_rows(normalized.view()).unwrap();
        for (a, b) in back.iter().zip(raw.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_rows_width_checked() {
        let registry = registry();
        let scaler = OutputScaler::new(&registry);
        assert!(scaler.normalize_rows(array![[1.0]].view()).is_err());
    }

    proptest! {
        #[test]
        fn prop_output_round_trip(x in -1.0e6f64..1.0e6) {
            let registry = registry();
            let scaler = OutputScaler::new(&registry);
            for attr in ["deviation", "thickness"] {
                let back = scaler.denormalize(scaler.normalize(x, attr).unwrap(), attr).unwrap();
                prop_assert!((back - x).abs() <= 1e-9 * x.abs().max(1.0));
            }
        }
    }
}
