//! Core units, constants, and shared primitives for the neutron coordinate conversion workspace.

pub mod units;

pub use units::{Quantity, Unit, UnitError};

/// Physical constants expressed in SI units (CODATA 2018).
pub mod constants {
    use crate::units::{self, Quantity};

    /// Neutron rest mass (kg).
    pub const NEUTRON_MASS_KG: f64 = 1.674_927_498_04e-27;
    /// Planck constant (J s).
    pub const PLANCK_J_S: f64 = 6.626_070_15e-34;
    /// Elementary charge (C), equivalently joules per electronvolt.
    pub const ELEMENTARY_CHARGE_C: f64 = 1.602_176_634e-19;

    /// Neutron mass as a unit-carrying quantity.
    pub fn neutron_mass() -> Quantity {
        Quantity::new(NEUTRON_MASS_KG, units::KG)
    }

    /// Planck constant as a unit-carrying quantity.
    pub fn planck() -> Quantity {
        Quantity::new(PLANCK_J_S, units::J * units::S)
    }

    /// Ratio turning flight-time values in microseconds into seconds.
    pub fn tof_to_s() -> Quantity {
        Quantity::new(1e-6, units::S / units::US)
    }

    /// Ratio turning joules into milli-electronvolts.
    pub fn joule_to_mev() -> Quantity {
        Quantity::new(1e3 / ELEMENTARY_CHARGE_C, units::MEV / units::J)
    }

    /// Ratio turning metres into ångström.
    pub fn m_to_angstrom() -> Quantity {
        Quantity::new(1e10, units::ANGSTROM / units::M)
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D position or direction, in the unit of the owning variable.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Distance between two points without materializing the difference elsewhere.
    #[inline]
    pub fn distance(a: &Vector3, b: &Vector3) -> f64 {
        norm(&sub(a, b))
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }

    /// Unit vector pointing from `from` to `to`.
    #[inline]
    pub fn direction(from: &Vector3, to: &Vector3) -> Vector3 {
        let d = sub(to, from);
        scale(&d, 1.0 / norm(&d))
    }
}

#[cfg(test)]
mod tests {
    use super::constants::{joule_to_mev, m_to_angstrom, tof_to_s};

    #[test]
    fn conversion_ratios_are_unity_in_si() {
        for ratio in [tof_to_s(), joule_to_mev(), m_to_angstrom()] {
            assert!((ratio.si_value() - 1.0).abs() < 1e-12, "{ratio:?}");
            assert!(ratio.unit.is_dimensionless());
        }
    }
}
