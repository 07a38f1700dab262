//! Errors surfaced by coordinate conversions.

use std::fmt;

use neutron_array::{ArrayError, Dim, Unit};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("required metadata `{0}` not found")]
    NotFound(Dim),
    #[error("unit mismatch in {op}: expected `{expected}`, found `{found}`")]
    UnitMismatch {
        op: &'static str,
        expected: Unit,
        found: Unit,
    },
    #[error("conversion between `{from}` and `{to}` not implemented yet or not possible")]
    UnsupportedConversion {
        from: Dim,
        to: Dim,
        #[source]
        source: Option<Box<ConvertError>>,
    },
    #[error("{0}")]
    InelasticDataConflict(InelasticConflict),
    #[error("`{field}` of item `{item}` differs from the other items, cannot merge it into a shared coordinate")]
    PositionConsistencyViolation { field: Dim, item: String },
    #[error("item `{item}` has count-density unit `{unit}`, which requires renormalization before conversion")]
    CountDensity { item: String, unit: Unit },
    #[error(transparent)]
    Array(ArrayError),
}

impl ConvertError {
    /// Innermost failure behind any relay wrapping, e.g. the missing geometry field that
    /// made a relayed conversion unsupported.
    pub fn root_cause(&self) -> &ConvertError {
        match self {
            ConvertError::UnsupportedConversion {
                source: Some(source),
                ..
            } => source.root_cause(),
            other => other,
        }
    }
}

impl From<ArrayError> for ConvertError {
    fn from(err: ArrayError) -> Self {
        match err {
            ArrayError::NotFound(dim) => ConvertError::NotFound(dim),
            ArrayError::UnitMismatch {
                op,
                expected,
                found,
            } => ConvertError::UnitMismatch {
                op,
                expected,
                found,
            },
            other => ConvertError::Array(other),
        }
    }
}

/// Which inelastic-energy precondition a conversion violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InelasticConflict {
    /// Energy transfer requested but both `incident_energy` and `final_energy` are present.
    BothEnergies,
    /// Energy transfer requested but neither energy is present.
    NoEnergy,
    /// Elastic energy requested for data carrying inelastic energies.
    InelasticEnergyPresent,
}

impl fmt::Display for InelasticConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InelasticConflict::BothEnergies => {
                "data contains coords for incident *and* final energy, cannot have both for inelastic scattering"
            }
            InelasticConflict::NoEnergy => {
                "data contains neither coords for incident nor for final energy, this does not appear to be inelastic-scattering data, cannot convert to energy transfer"
            }
            InelasticConflict::InelasticEnergyPresent => {
                "data contains coords for incident or final energy, conversion to energy for inelastic data not implemented yet"
            }
        })
    }
}
