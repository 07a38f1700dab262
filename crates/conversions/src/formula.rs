//! Scalar conversion formulas evaluated per element by the engine.
//!
//! Each formula is a pure function of the coordinate value `x` and up to three
//! precomputed arguments that are broadcast against the coordinate. Units are derived
//! from the argument units once per variable, never per element.

use neutron_array::{ArrayError, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formula {
    /// `x · c`
    Scale,
    /// `c / x²`
    TofToEnergy,
    /// `sqrt(c / x)`
    EnergyToTof,
    /// `s / (x - t0)² - e0` with arguments `(s, t0, e0)`
    TofToEnergyTransfer,
    /// `t0 + sqrt(s / (x + e0))` with arguments `(s, t0, e0)`
    EnergyTransferToTof,
    /// `c / x`, its own inverse (wavelength and Q)
    ScaledReciprocal,
}

fn expect_unit(op: &'static str, expected: Unit, found: Unit) -> Result<(), ArrayError> {
    if expected != found {
        return Err(ArrayError::UnitMismatch {
            op,
            expected,
            found,
        });
    }
    Ok(())
}

impl Formula {
    /// Number of precomputed arguments the formula consumes.
    pub fn arity(self) -> usize {
        match self {
            Formula::TofToEnergyTransfer | Formula::EnergyTransferToTof => 3,
            _ => 1,
        }
    }

    /// Whether coordinate variances can be carried through the formula.
    ///
    /// Only the linear [`Formula::Scale`] propagates them, as `σ² · c²`.
    pub fn propagates_variances(self) -> bool {
        self == Formula::Scale
    }

    #[inline]
    pub fn eval(self, x: f64, args: &[f64]) -> f64 {
        match self {
            Formula::Scale => x * args[0],
            Formula::TofToEnergy => args[0] / (x * x),
            Formula::EnergyToTof => (args[0] / x).sqrt(),
            Formula::TofToEnergyTransfer => {
                let t = x - args[1];
                args[0] / (t * t) - args[2]
            }
            Formula::EnergyTransferToTof => args[1] + (args[0] / (x + args[2])).sqrt(),
            Formula::ScaledReciprocal => args[0] / x,
        }
    }

    /// Unit of the result, validating that the operands are compatible.
    pub fn unit(self, x: Unit, args: &[Unit]) -> Result<Unit, ArrayError> {
        match self {
            Formula::Scale => Ok(x * args[0]),
            Formula::TofToEnergy => Ok(args[0] / x.powi(2)),
            Formula::EnergyToTof => Ok((args[0] / x).sqrt()?),
            Formula::TofToEnergyTransfer => {
                expect_unit("tof_to_energy_transfer", args[1], x)?;
                expect_unit("tof_to_energy_transfer", args[2], args[0] / x.powi(2))?;
                Ok(args[2])
            }
            Formula::EnergyTransferToTof => {
                expect_unit("energy_transfer_to_tof", args[2], x)?;
                expect_unit("energy_transfer_to_tof", args[1], (args[0] / x).sqrt()?)?;
                Ok(args[1])
            }
            Formula::ScaledReciprocal => Ok(args[0] / x),
        }
    }
}

#[cfg(test)]
mod tests {
    use neutron_array::units;

    use super::*;

    #[test]
    fn energy_formulas_invert_each_other() {
        let c = 5.2e6;
        let e = Formula::TofToEnergy.eval(1200.0, &[c]);
        let t = Formula::EnergyToTof.eval(e, &[c]);
        assert!((t - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn energy_transfer_formulas_invert_each_other() {
        let args = [-3.0e6, 800.0, -25.0];
        let de = Formula::TofToEnergyTransfer.eval(2000.0, &args);
        let t = Formula::EnergyTransferToTof.eval(de, &args);
        assert!((t - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn energy_transfer_unit_checks_offset() {
        let s = units::MEV * units::US * units::US;
        let ok = Formula::TofToEnergyTransfer.unit(units::US, &[s, units::US, units::MEV]);
        assert_eq!(ok.unwrap(), units::MEV);
        let wrong = Formula::TofToEnergyTransfer.unit(units::M, &[s, units::US, units::MEV]);
        assert!(matches!(wrong, Err(ArrayError::UnitMismatch { .. })));
    }

    #[test]
    fn reciprocal_is_self_inverse() {
        let c = 4.0 * std::f64::consts::PI;
        let q = Formula::ScaledReciprocal.eval(2.0, &[c]);
        assert!((Formula::ScaledReciprocal.eval(q, &[c]) - 2.0).abs() < 1e-12);
        assert_eq!(
            Formula::ScaledReciprocal.unit(units::ANGSTROM, &[units::ONE]).unwrap(),
            units::INV_ANGSTROM
        );
    }
}
