//! Join and Column Validation

use crate::error::TableError;
use crate::table::{DesignTable, ObservationTable};
use crate::value::DoeId;
use tracing::debug;

/// Consistency checks run before the design table is joined onto observations
pub struct TableValidator<'a> {
    design: &'a DesignTable,
    observations: &'a ObservationTable,
}

impl<'a> TableValidator<'a> {
    /// Create a validator over a table pair
    pub fn new(design: &'a DesignTable, observations: &'a ObservationTable) -> Self {
        Self {
            design,
            observations,
        }
    }

    /// Fail on the first observation row without a design row
    pub fn validate_join(&self) -> Result<(), TableError> {
        match self
            .observations
            .ids()
            .iter()
            .find(|&&id| !self.design.contains(id))
        {
            Some(&id) => Err(TableError::MissingDesignRow(id)),
            None => {
                debug!("Join check passed for {} rows", self.observations.len());
                Ok(())
            }
        }
    }

    /// Require design table columns
    pub fn require_design_columns<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), TableError> {
        for name in names {
            if !self.design.has_column(name) {
                return Err(TableError::MissingColumn {
                    table: "design",
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Require observation table columns
    pub fn require_observation_columns<'n>(
        &self,
        names: impl IntoIterator<Item = &'n str>,
    ) -> Result<(), TableError> {
        for name in names {
            if !self.observations.has_column(name) {
                return Err(TableError::MissingColumn {
                    table: "observation",
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }
}
