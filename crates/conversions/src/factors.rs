//! Precomputed conversion factors and formula arguments derived from beamline geometry.
//!
//! Multiplicative factors are returned as variables spanning the geometry dimensions
//! (usually `spectrum`) so the engine can broadcast them against coordinates of any shape.

use std::f64::consts::PI;

use neutron_array::{Meta, Variable, ops, units};
use neutron_beamline::{self as beamline, ConvertMode};
use neutron_core::constants::{joule_to_mev, m_to_angstrom, neutron_mass, planck, tof_to_s};
use neutron_core::units::Quantity;

use crate::error::{ConvertError, InelasticConflict};

/// `½ mₙ / (µs → s)²` in meV µs² / m².
fn tof_to_energy_physical_constant() -> Quantity {
    neutron_mass() * joule_to_mev() * 0.5 / (tof_to_s() * tof_to_s())
}

/// `2 mₙ / h`, scaled so that `dspacing [Å] · L [m]` yields flight time in µs.
fn dspacing_physical_constant() -> Quantity {
    neutron_mass() * 2.0 / planck() / (m_to_angstrom() * tof_to_s())
}

/// `h / mₙ`, scaled so that `tof [µs] / L [m]` yields wavelength in Å.
fn wavelength_physical_constant() -> Quantity {
    tof_to_s() * m_to_angstrom() * planck() / neutron_mass()
}

/// Factor turning d-spacing into flight time: `2 mₙ L sinθ / h`.
pub fn dspacing_to_tof(meta: &Meta<'_>) -> Result<Variable, ConvertError> {
    let length = ops::add(&beamline::l1(meta)?, &beamline::l2(meta)?)?;
    let one_minus_cos = ops::sub(
        &Variable::scalar(1.0, units::ONE),
        &beamline::cos_two_theta(meta)?,
    )?;
    // sinθ = sqrt((1 - cos2θ) / 2)
    let sin_theta = ops::sqrt(&ops::scale(&one_minus_cos, 0.5)?)?;
    let constant = Variable::from(dspacing_physical_constant());
    Ok(ops::mul(&ops::mul(&constant, &length)?, &sin_theta)?)
}

pub fn tof_to_dspacing(meta: &Meta<'_>) -> Result<Variable, ConvertError> {
    Ok(ops::reciprocal(&dspacing_to_tof(meta)?)?)
}

pub fn tof_to_wavelength(meta: &Meta<'_>, mode: ConvertMode) -> Result<Variable, ConvertError> {
    let length = beamline::flight_path_length(meta, mode)?;
    let constant = Variable::from(wavelength_physical_constant());
    Ok(ops::div(&constant, &length)?)
}

pub fn wavelength_to_tof(meta: &Meta<'_>, mode: ConvertMode) -> Result<Variable, ConvertError> {
    Ok(ops::reciprocal(&tof_to_wavelength(meta, mode)?)?)
}

/// Numerator `C L²` of the elastic relation `E = C L² / t²`.
///
/// Data carrying an incident or final energy is inelastic and rejected.
pub fn tof_to_energy(meta: &Meta<'_>, mode: ConvertMode) -> Result<Variable, ConvertError> {
    if beamline::incident_energy(meta).is_some() || beamline::final_energy(meta).is_some() {
        return Err(ConvertError::InelasticDataConflict(
            InelasticConflict::InelasticEnergyPresent,
        ));
    }
    let length = beamline::flight_path_length(meta, mode)?;
    let constant = Variable::from(tof_to_energy_physical_constant());
    Ok(ops::mul(&constant, &ops::mul(&length, &length)?)?)
}

/// Arguments `(s, t0, e0)` of `ΔE = s / (t - t0)² - e0`.
///
/// Direct geometry (incident energy known): `(-C L2², sqrt(C L1² / Ei), -Ei)`.
/// Indirect geometry (final energy known): `(C L1², sqrt(C L2² / Ef), Ef)`.
pub fn tof_to_energy_transfer(meta: &Meta<'_>) -> Result<Vec<Variable>, ConvertError> {
    let incident = beamline::incident_energy(meta);
    let final_energy = beamline::final_energy(meta);
    let constant = Variable::from(tof_to_energy_physical_constant());
    let scaled_square = |length: &Variable| -> Result<Variable, ConvertError> {
        Ok(ops::mul(&constant, &ops::mul(length, length)?)?)
    };
    match (incident, final_energy) {
        (Some(_), Some(_)) => Err(ConvertError::InelasticDataConflict(
            InelasticConflict::BothEnergies,
        )),
        (None, None) => Err(ConvertError::InelasticDataConflict(
            InelasticConflict::NoEnergy,
        )),
        (Some(ei), None) => {
            tracing::debug!("direct-inelastic geometry, using incident energy");
            let l1_sq = scaled_square(&beamline::l1(meta)?)?;
            let l2_sq = scaled_square(&beamline::l2(meta)?)?;
            Ok(vec![
                ops::neg(&l2_sq)?,
                ops::sqrt(&ops::div(&l1_sq, ei)?)?,
                ops::neg(ei)?,
            ])
        }
        (None, Some(ef)) => {
            tracing::debug!("indirect-inelastic geometry, using final energy");
            let l1_sq = scaled_square(&beamline::l1(meta)?)?;
            let l2_sq = scaled_square(&beamline::l2(meta)?)?;
            Ok(vec![l1_sq, ops::sqrt(&ops::div(&l2_sq, ef)?)?, ef.clone()])
        }
    }
}

/// `4π sinθ`, the numerator shared by `Q = 4π sinθ / λ` and its inverse.
pub fn wavelength_to_q(meta: &Meta<'_>) -> Result<Variable, ConvertError> {
    let sin_theta = ops::sin(&beamline::scattering_angle(meta)?)?;
    Ok(ops::scale(&sin_theta, 4.0 * PI)?)
}

#[cfg(test)]
mod tests {
    use neutron_array::{Coords, Dim};
    use neutron_core::constants::{NEUTRON_MASS_KG, PLANCK_J_S};

    use super::*;

    fn overrides(entries: &[(Dim, Variable)]) -> Coords {
        let mut coords = Coords::new();
        for (dim, value) in entries {
            coords.insert(dim.clone(), value.clone());
        }
        coords
    }

    #[test]
    fn wavelength_factor_is_h_over_m_l() {
        let coords = overrides(&[(beamline::L, Variable::scalar(10.0, units::M))]);
        let meta = Meta::new(&coords, None);
        let factor = tof_to_wavelength(&meta, ConvertMode::NoScatter).unwrap();
        assert_eq!(factor.unit(), units::ANGSTROM / units::US);
        let expected = PLANCK_J_S / NEUTRON_MASS_KG / 10.0 * 1e10 * 1e-6;
        assert!((factor.value().unwrap() - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn dspacing_factor_uses_bragg_angle() {
        let coords = overrides(&[
            (beamline::L1, Variable::scalar(10.0, units::M)),
            (beamline::L2, Variable::scalar(1.0, units::M)),
            (beamline::TWO_THETA, Variable::scalar(PI / 2.0, units::RAD)),
        ]);
        let meta = Meta::new(&coords, None);
        let factor = dspacing_to_tof(&meta).unwrap();
        assert_eq!(factor.unit(), units::US / units::ANGSTROM);
        let sin_theta = (PI / 4.0).sin();
        let expected = 2.0 * NEUTRON_MASS_KG / PLANCK_J_S * 11.0 * sin_theta * 1e-10 * 1e6;
        assert!((factor.value().unwrap() - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn elastic_energy_rejects_inelastic_data() {
        let coords = overrides(&[
            (beamline::L, Variable::scalar(10.0, units::M)),
            (Dim::INCIDENT_ENERGY, Variable::scalar(25.0, units::MEV)),
        ]);
        let meta = Meta::new(&coords, None);
        let err = tof_to_energy(&meta, ConvertMode::NoScatter).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::InelasticDataConflict(InelasticConflict::InelasticEnergyPresent)
        ));
    }

    /// `½ mₙ` in meV µs² / m².
    fn half_mass() -> f64 {
        0.5 * NEUTRON_MASS_KG / 1.602_176_634e-22 * 1e12
    }

    #[test]
    fn energy_constant_is_half_neutron_mass() {
        let coords = overrides(&[(beamline::L, Variable::scalar(10.0, units::M))]);
        let meta = Meta::new(&coords, None);
        let numerator = tof_to_energy(&meta, ConvertMode::NoScatter).unwrap();
        assert_eq!(numerator.unit(), units::MEV * units::US * units::US);
        let expected = half_mass() * 100.0;
        assert!((numerator.value().unwrap() - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn energy_transfer_arguments_follow_geometry() {
        let geometry = [
            (beamline::L1, Variable::scalar(10.0, units::M)),
            (beamline::L2, Variable::scalar(2.0, units::M)),
        ];
        let c = half_mass();

        let mut direct = overrides(&geometry);
        direct.insert(Dim::INCIDENT_ENERGY, Variable::scalar(25.0, units::MEV));
        let args = tof_to_energy_transfer(&Meta::new(&direct, None)).unwrap();
        let values: Vec<f64> = args.iter().map(|a| a.value().unwrap()).collect();
        assert_eq!(args[1].unit(), units::US);
        assert!((values[0] + c * 4.0).abs() / (c * 4.0) < 1e-12);
        let t0 = (c * 100.0 / 25.0).sqrt();
        assert!((values[1] - t0).abs() / t0 < 1e-12);
        assert_eq!(values[2], -25.0);

        let mut indirect = overrides(&geometry);
        indirect.insert(Dim::FINAL_ENERGY, Variable::scalar(5.0, units::MEV));
        let args = tof_to_energy_transfer(&Meta::new(&indirect, None)).unwrap();
        let values: Vec<f64> = args.iter().map(|a| a.value().unwrap()).collect();
        assert!((values[0] - c * 100.0).abs() / (c * 100.0) < 1e-12);
        let t0 = (c * 4.0 / 5.0).sqrt();
        assert!((values[1] - t0).abs() / t0 < 1e-12);
        assert_eq!(values[2], 5.0);
    }
}
