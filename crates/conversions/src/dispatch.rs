//! Routing a `from -> to` request to the matching factor or formula.
//!
//! Direct conversions are listed in [`RULES`]. Any other pair of known axes is relayed
//! through flight time, the hub every axis converts to and from.

use neutron_array::{Dim, Measurement, Meta, Variable};
use neutron_beamline::ConvertMode;

use crate::engine;
use crate::error::ConvertError;
use crate::factors;
use crate::formula::Formula;
use crate::relocate;

/// Axis every other axis converts to and from.
pub const HUB: Dim = Dim::TOF;

type FactorFn = fn(&Meta<'_>, ConvertMode) -> Result<Variable, ConvertError>;
type ArgsFn = fn(&Meta<'_>, ConvertMode) -> Result<Vec<Variable>, ConvertError>;

enum Step {
    /// Multiply by a geometry-dependent factor.
    Factor(FactorFn),
    /// Evaluate a formula with geometry-dependent arguments.
    Formula(Formula, ArgsFn),
}

struct Rule {
    from: Dim,
    to: Dim,
    step: Step,
}

static RULES: [Rule; 10] = [
    Rule {
        from: Dim::TOF,
        to: Dim::DSPACING,
        step: Step::Factor(|meta, _| factors::tof_to_dspacing(meta)),
    },
    Rule {
        from: Dim::DSPACING,
        to: Dim::TOF,
        step: Step::Factor(|meta, _| factors::dspacing_to_tof(meta)),
    },
    Rule {
        from: Dim::TOF,
        to: Dim::WAVELENGTH,
        step: Step::Factor(factors::tof_to_wavelength),
    },
    Rule {
        from: Dim::WAVELENGTH,
        to: Dim::TOF,
        step: Step::Factor(factors::wavelength_to_tof),
    },
    Rule {
        from: Dim::TOF,
        to: Dim::ENERGY,
        step: Step::Formula(Formula::TofToEnergy, |meta, mode| {
            Ok(vec![factors::tof_to_energy(meta, mode)?])
        }),
    },
    Rule {
        from: Dim::ENERGY,
        to: Dim::TOF,
        step: Step::Formula(Formula::EnergyToTof, |meta, mode| {
            Ok(vec![factors::tof_to_energy(meta, mode)?])
        }),
    },
    Rule {
        from: Dim::TOF,
        to: Dim::ENERGY_TRANSFER,
        step: Step::Formula(Formula::TofToEnergyTransfer, |meta, _| {
            factors::tof_to_energy_transfer(meta)
        }),
    },
    Rule {
        from: Dim::ENERGY_TRANSFER,
        to: Dim::TOF,
        step: Step::Formula(Formula::EnergyTransferToTof, |meta, _| {
            factors::tof_to_energy_transfer(meta)
        }),
    },
    Rule {
        from: Dim::WAVELENGTH,
        to: Dim::Q,
        step: Step::Formula(Formula::ScaledReciprocal, |meta, _| {
            Ok(vec![factors::wavelength_to_q(meta)?])
        }),
    },
    Rule {
        from: Dim::Q,
        to: Dim::WAVELENGTH,
        step: Step::Formula(Formula::ScaledReciprocal, |meta, _| {
            Ok(vec![factors::wavelength_to_q(meta)?])
        }),
    },
];

fn find_rule(from: &Dim, to: &Dim) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.from == *from && rule.to == *to)
}

/// Whether `from -> to` is a single table step, without relaying.
pub fn is_direct(from: &Dim, to: &Dim) -> bool {
    find_rule(from, to).is_some()
}

/// Count densities (e.g. counts/µs) would need renormalizing by the bin-width Jacobian.
fn reject_count_density<T: Measurement>(data: &T) -> Result<(), ConvertError> {
    for (name, item) in data.items() {
        let unit = item.unit();
        if unit.is_count_density() {
            return Err(ConvertError::CountDensity {
                item: name.to_string(),
                unit,
            });
        }
    }
    Ok(())
}

fn convert_impl<T: Measurement>(
    data: T,
    from: &Dim,
    to: &Dim,
    mode: ConvertMode,
) -> Result<T, ConvertError> {
    if from == to {
        return Ok(data);
    }
    // Each relay leg restores the geometry its own pair needs.
    let data = relocate::attrs_to_coords(data, from, to, mode)?;
    if let Some(rule) = find_rule(from, to) {
        tracing::debug!(%from, %to, ?mode, "converting");
        return match rule.step {
            Step::Factor(factor) => {
                let factor = factor(&data.meta(), mode)?;
                engine::convert_with_factor(data, from, to, factor)
            }
            Step::Formula(formula, args) => {
                let args = args(&data.meta(), mode)?;
                engine::convert_generic(data, from, to, formula, &args)
            }
        };
    }
    if *from == HUB || *to == HUB {
        return Err(ConvertError::UnsupportedConversion {
            from: from.clone(),
            to: to.clone(),
            source: None,
        });
    }
    tracing::debug!(%from, %to, hub = %HUB, "relaying through hub");
    convert_impl(data, from, &HUB, mode)
        .and_then(|data| convert_impl(data, &HUB, to, mode))
        .map_err(|source| ConvertError::UnsupportedConversion {
            from: from.clone(),
            to: to.clone(),
            source: Some(Box::new(source)),
        })
}

/// Convert the `from` axis of `data` into `to`, inferring the scattering mode from the
/// presence of `sample_position`.
///
/// The container is consumed; on error nothing of it is returned.
pub fn convert<T: Measurement>(data: T, from: &Dim, to: &Dim) -> Result<T, ConvertError> {
    let mode = ConvertMode::infer(&data.meta());
    convert_with_mode(data, from, to, mode)
}

/// [`convert`] with an explicit scattering mode.
pub fn convert_with_mode<T: Measurement>(
    data: T,
    from: &Dim,
    to: &Dim,
    mode: ConvertMode,
) -> Result<T, ConvertError> {
    reject_count_density(&data)?;
    let data = convert_impl(data, from, to, mode)?;
    relocate::coords_to_attrs(data, from, to, mode)
}

/// Convert a copy of `data`, leaving the input untouched.
pub fn convert_view<T: Measurement>(data: &T, from: &Dim, to: &Dim) -> Result<T, ConvertError> {
    convert(data.clone(), from, to)
}
