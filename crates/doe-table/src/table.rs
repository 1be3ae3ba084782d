//! Design and Observation Tables

use crate::error::TableError;
use crate::value::{AttrValue, DoeId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Design-of-experiments table: one row per experiment.
#[derive(Debug, Clone)]
pub struct DesignTable {
    /// Name of the experiment id column
    index: String,
    /// Experiment ids, one per row
    ids: Vec<DoeId>,
    /// Row lookup by id
    rows: HashMap<DoeId, usize>,
    /// Named columns in insertion order
    columns: Vec<(String, Vec<AttrValue>)>,
}

impl DesignTable {
    /// Create a table with the given experiment ids and no columns
    pub fn new(index: impl Into<String>, ids: Vec<DoeId>) -> Result<Self, TableError> {
        let mut rows = HashMap::with_capacity(ids.len());
        for (row, &id) in ids.iter().enumerate() {
            if rows.insert(id, row).is_some() {
                return Err(TableError::DuplicateKey(id));
            }
        }

        Ok(Self {
            index: index.into(),
            ids,
            rows,
            columns: Vec::new(),
        })
    }

    /// Add a column of raw values
    pub fn with_column<V: Into<AttrValue>>(
        mut self,
        name: impl Into<String>,
        values: Vec<V>,
    ) -> Result<Self, TableError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn(name));
        }
        if values.len() != self.ids.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.ids.len(),
                actual: values.len(),
            });
        }

        let values: Vec<AttrValue> = values.into_iter().map(Into::into).collect();
        if let Some(row) = values.iter().position(|v| !v.is_finite()) {
            return Err(TableError::NonFinite { column: name, row });
        }

        debug!("Design table: added column '{}'", name);
        self.columns.push((name, values));
        Ok(self)
    }

    /// Name of the experiment id column
    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Number of experiments
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no experiments
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Experiment ids in row order
    pub fn ids(&self) -> &[DoeId] {
        &self.ids
    }

    /// Whether the experiment exists
    pub fn contains(&self, id: DoeId) -> bool {
        self.row_of(id).is_some()
    }

    /// Row index of an experiment
    pub fn row_of(&self, id: DoeId) -> Option<usize> {
        self.rows.get(&id).copied()
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Values of a column in row order
    pub fn column(&self, name: &str) -> Option<&[AttrValue]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Single cell lookup
    pub fn value(&self, id: DoeId, column: &str) -> Option<&AttrValue> {
        let row = self.row_of(id)?;
        self.column(column).map(|values| &values[row])
    }
}

/// Observation table: many rows per experiment, numeric positions and outputs.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    /// Name of the experiment id column
    index: String,
    /// Owning experiment of each row
    ids: Vec<DoeId>,
    /// Named numeric columns in insertion order
    columns: Vec<(String, Vec<f64>)>,
}

impl ObservationTable {
    /// Create a table with the owning experiment id of each row
    pub fn new(index: impl Into<String>, ids: Vec<DoeId>) -> Self {
        Self {
            index: index.into(),
            ids,
            columns: Vec::new(),
        }
    }

    /// Add a numeric column
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, TableError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn(name));
        }
        if values.len() != self.ids.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.ids.len(),
                actual: values.len(),
            });
        }
        if let Some(row) = values.iter().position(|v| !v.is_finite()) {
            return Err(TableError::NonFinite { column: name, row });
        }

        self.columns.push((name, values));
        Ok(self)
    }

    /// Name of the experiment id column
    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Owning experiment of each row
    pub fn ids(&self) -> &[DoeId] {
        &self.ids
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Values of a column in row order
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Distinct experiments in order of first appearance
    pub fn experiments(&self) -> Vec<DoeId> {
        let mut seen = HashSet::new();
        self.ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    }

    /// Row indices belonging to one experiment
    pub fn rows_for(&self, id: DoeId) -> Vec<usize> {
        self.ids
            .iter()
            .enumerate()
            .filter(|(_, &x)| x == id)
            .map(|(row, _)| row)
            .collect()
    }

    /// Copy of the table with every row of the given experiments removed
    pub fn without_experiments(&self, excluded: &[DoeId]) -> Self {
        let keep: Vec<usize> = (0..self.ids.len())
            .filter(|&row| !excluded.contains(&self.ids[row]))
            .collect();

        debug!(
            "Dropping {} observation rows of experiments {:?}",
            self.ids.len() - keep.len(),
            excluded
        );

        Self {
            index: self.index.clone(),
            ids: keep.iter().map(|&row| self.ids[row]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), keep.iter().map(|&row| values[row]).collect()))
                .collect(),
        }
    }
}
