//! Experiment Tables
//!
//! In-memory design-of-experiments and observation tables, keyed by the
//! experiment id, plus the consistency checks run before they are joined.

mod error;
mod table;
mod validator;
mod value;

pub use error::TableError;
pub use table::{DesignTable, ObservationTable};
pub use validator::TableValidator;
pub use value::{AttrValue, DoeId};

/// Default name of the experiment id column.
pub const DEFAULT_INDEX: &str = "doe_id";
