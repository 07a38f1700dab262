//! Error type shared by all array operations.

use neutron_core::{Unit, UnitError};
use thiserror::Error;

use crate::dim::Dim;
use crate::variable::DType;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArrayError {
    #[error("`{0}` not found")]
    NotFound(Dim),
    #[error("item `{0}` not found")]
    ItemNotFound(String),
    #[error("unit mismatch in {op}: expected `{expected}`, found `{found}`")]
    UnitMismatch {
        op: &'static str,
        expected: Unit,
        found: Unit,
    },
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: String, found: String },
    #[error("shape mismatch: {dims} holds {expected} elements, got {found}")]
    ShapeMismatch {
        dims: String,
        expected: usize,
        found: usize,
    },
    #[error("expected {expected:?} elements, found {found:?}")]
    DTypeMismatch { expected: DType, found: DType },
    #[error("invalid bin indices: {0}")]
    InvalidBinIndices(String),
    #[error("{0} does not support variances")]
    VariancesUnsupported(&'static str),
    #[error(transparent)]
    Unit(#[from] UnitError),
}
