//! Error and warning types for allocation runs.

use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Fatal conditions of an allocation run. Every variant carries a message
/// naming the offending attribute, file, line or shape.
#[derive(Error, Debug)]
pub enum AllocationError {
    /// Malformed or missing mode configuration, unresolvable attribute, or type/mode mismatch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Output polygon count does not match the declared grid shape.
    #[error("shape mismatch: data layer has {count} polygons but the grid is {rows} rows x {cols} cols ({} cells)", .rows * .cols)]
    ShapeMismatch {
        count: usize,
        rows: usize,
        cols: usize,
    },

    /// Layer contents do not satisfy what the allocator needs.
    #[error("schema error: {0}")]
    Schema(String),

    /// A configuration or output resource could not be opened or created.
    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AllocationError {
    pub(crate) fn config(msg: impl Into<String>) -> Self { Self::Configuration(msg.into()) }

    pub(crate) fn schema(msg: impl Into<String>) -> Self { Self::Schema(msg.into()) }
}

/// Non-fatal conditions recovered during a run. The affected output value is MISSING.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationWarning {
    /// An average or area percent was requested over zero total area.
    DivideByZero {
        attribute: String,
        polygon: usize,
    },
    /// A derived field could not be represented by the chosen output format.
    SkippedField {
        attribute: String,
        reason: String,
    },
    /// A derived field was stored under a shorter name than it was computed with.
    RenamedField {
        attribute: String,
        stored_as: String,
    },
}

impl fmt::Display for AllocationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationWarning::DivideByZero { attribute, polygon } => write!(f,
                "division by zero computing {attribute} for output polygon {polygon}; value set to MISSING"),
            AllocationWarning::SkippedField { attribute, reason } => write!(f,
                "field {attribute} not written: {reason}"),
            AllocationWarning::RenamedField { attribute, stored_as } => write!(f,
                "field {attribute} stored as {stored_as} in the DBF table"),
        }
    }
}
