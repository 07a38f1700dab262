//! Beamline geometry derived from the positional metadata of a measurement.
//!
//! Every quantity may be overridden by storing a coordinate (or attribute) of the matching
//! name: `L` for the total flight path, `L1`, `L2`, and `two_theta`. Without overrides the
//! values are computed from `source_position`, `sample_position` and the per-detector
//! `position`. Data without `sample_position` is treated as non-scattering (monitors,
//! imaging); only [`flight_path_length`] in [`ConvertMode::NoScatter`] is usable for it.

use neutron_array::{ArrayError, Dim, Meta, Variable, ops};
use serde::{Deserialize, Serialize};

/// Override for the total flight path length.
pub const L: Dim = Dim::fixed("L");
/// Override for the source-sample distance.
pub const L1: Dim = Dim::fixed("L1");
/// Override for the sample-detector distance.
pub const L2: Dim = Dim::fixed("L2");
/// Override for the scattering angle between incident and scattered beam.
pub const TWO_THETA: Dim = Dim::fixed("two_theta");

/// Whether the particle changes direction at the sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvertMode {
    Scatter,
    NoScatter,
}

impl ConvertMode {
    /// Scattering mode implied by the presence of a `sample_position`.
    pub fn infer(meta: &Meta<'_>) -> Self {
        if meta.contains(&Dim::SAMPLE_POSITION) {
            ConvertMode::Scatter
        } else {
            ConvertMode::NoScatter
        }
    }
}

pub fn position<'a>(meta: &Meta<'a>) -> Result<&'a Variable, ArrayError> {
    meta.require(&Dim::POSITION)
}

pub fn source_position<'a>(meta: &Meta<'a>) -> Result<&'a Variable, ArrayError> {
    meta.require(&Dim::SOURCE_POSITION)
}

pub fn sample_position<'a>(meta: &Meta<'a>) -> Result<&'a Variable, ArrayError> {
    meta.require(&Dim::SAMPLE_POSITION)
}

/// Source to detector path length.
///
/// In [`ConvertMode::NoScatter`] this is the straight distance from the source, so neither
/// `sample_position` nor an `L2` override plays a role.
pub fn flight_path_length(meta: &Meta<'_>, mode: ConvertMode) -> Result<Variable, ArrayError> {
    if let Some(total) = meta.get(&L) {
        tracing::trace!("using `L` override for flight path length");
        return Ok(total.clone());
    }
    match mode {
        ConvertMode::Scatter => ops::add(&l1(meta)?, &l2(meta)?),
        ConvertMode::NoScatter => ops::distance(position(meta)?, source_position(meta)?),
    }
}

pub fn l1(meta: &Meta<'_>) -> Result<Variable, ArrayError> {
    if let Some(l1) = meta.get(&L1) {
        return Ok(l1.clone());
    }
    ops::distance(sample_position(meta)?, source_position(meta)?)
}

pub fn l2(meta: &Meta<'_>) -> Result<Variable, ArrayError> {
    if let Some(l2) = meta.get(&L2) {
        return Ok(l2.clone());
    }
    // Fused kernel: no intermediate array of difference vectors per detector.
    ops::distance(position(meta)?, sample_position(meta)?)
}

pub fn cos_two_theta(meta: &Meta<'_>) -> Result<Variable, ArrayError> {
    if let Some(two_theta) = meta.get(&TWO_THETA) {
        return ops::cos(two_theta);
    }
    let sample = sample_position(meta)?;
    let beam = ops::direction(source_position(meta)?, sample)?;
    let scattered = ops::direction(sample, position(meta)?)?;
    ops::dot(&beam, &scattered)
}

pub fn two_theta(meta: &Meta<'_>) -> Result<Variable, ArrayError> {
    if let Some(two_theta) = meta.get(&TWO_THETA) {
        return Ok(two_theta.clone());
    }
    ops::acos(&cos_two_theta(meta)?)
}

/// Bragg angle θ, half of [`two_theta`].
pub fn scattering_angle(meta: &Meta<'_>) -> Result<Variable, ArrayError> {
    ops::scale(&two_theta(meta)?, 0.5)
}

/// Incident energy of direct-inelastic data; `None` for other data.
pub fn incident_energy<'a>(meta: &Meta<'a>) -> Option<&'a Variable> {
    meta.get(&Dim::INCIDENT_ENERGY)
}

/// Final energy of indirect-inelastic data; `None` for other data.
pub fn final_energy<'a>(meta: &Meta<'a>) -> Option<&'a Variable> {
    meta.get(&Dim::FINAL_ENERGY)
}
