//! Elementwise application of a [`Formula`] to dense coordinates and event buffers.
//!
//! A conversion touches at most two places: the dense coordinate named by the source
//! dimension (bin edges or point coordinates), and the event coordinate of the same name
//! inside each binned item's buffer. Both are transformed in place, then the dimension
//! is renamed across the container. Units and variance support are checked for every
//! target before the first element is written.

use neutron_array::{
    ArrayError, BinnedViewMut, DType, Dim, Dimensions, Measurement, Unit, Values, Variable, ops,
};

use crate::error::ConvertError;
use crate::formula::Formula;

/// Maps an element of the transformed variable to its row in the broadcast arguments.
enum Rows {
    /// Arguments are broadcast to the variable itself.
    Dense,
    /// Event `i` belongs to outer element `rows[i]`.
    Binned(Vec<usize>),
}

impl Rows {
    fn from_ranges(ranges: &[(usize, usize)]) -> Self {
        let mut rows = Vec::with_capacity(ranges.last().map_or(0, |&(_, end)| end));
        for (row, &(begin, end)) in ranges.iter().enumerate() {
            rows.extend(std::iter::repeat_n(row, end - begin));
        }
        Rows::Binned(rows)
    }

    #[inline]
    fn row(&self, index: usize) -> usize {
        match self {
            Rows::Dense => index,
            Rows::Binned(rows) => rows[index],
        }
    }
}

type Kernel =
    fn(Formula, &mut Values, Option<&mut Vec<f64>>, &Rows, &[Vec<f64>]) -> Result<(), ArrayError>;

/// Kernel registered for an element type; float32 is computed in float64 and narrowed.
fn kernel_for(dtype: DType) -> Result<Kernel, ArrayError> {
    match dtype {
        DType::Float64 => Ok(apply_f64),
        DType::Float32 => Ok(apply_f32),
        other => Err(ArrayError::DTypeMismatch {
            expected: DType::Float64,
            found: other,
        }),
    }
}

fn apply_f64(
    formula: Formula,
    values: &mut Values,
    variances: Option<&mut Vec<f64>>,
    rows: &Rows,
    args: &[Vec<f64>],
) -> Result<(), ArrayError> {
    match values {
        Values::F64(xs) => {
            apply_slice(formula, xs, |x| x, |y| y, rows, args);
            scale_variances(formula, variances, rows, args);
            Ok(())
        }
        other => Err(ArrayError::DTypeMismatch {
            expected: DType::Float64,
            found: other.dtype(),
        }),
    }
}

fn apply_f32(
    formula: Formula,
    values: &mut Values,
    variances: Option<&mut Vec<f64>>,
    rows: &Rows,
    args: &[Vec<f64>],
) -> Result<(), ArrayError> {
    match values {
        Values::F32(xs) => {
            apply_slice(formula, xs, f64::from, |y| y as f32, rows, args);
            scale_variances(formula, variances, rows, args);
            Ok(())
        }
        other => Err(ArrayError::DTypeMismatch {
            expected: DType::Float32,
            found: other.dtype(),
        }),
    }
}

fn apply_slice<T: Copy>(
    formula: Formula,
    xs: &mut [T],
    widen: impl Fn(T) -> f64,
    narrow: impl Fn(f64) -> T,
    rows: &Rows,
    args: &[Vec<f64>],
) {
    let mut row_args = [0.0; 3];
    let arity = args.len();
    for (i, x) in xs.iter_mut().enumerate() {
        let row = rows.row(i);
        for (slot, arg) in row_args.iter_mut().zip(args) {
            *slot = arg[row];
        }
        *x = narrow(formula.eval(widen(*x), &row_args[..arity]));
    }
}

fn scale_variances(formula: Formula, variances: Option<&mut Vec<f64>>, rows: &Rows, args: &[Vec<f64>]) {
    if let (Formula::Scale, Some(variances)) = (formula, variances) {
        for (i, variance) in variances.iter_mut().enumerate() {
            let factor = args[0][rows.row(i)];
            *variance *= factor * factor;
        }
    }
}

/// Argument values laid out over `dims`, one vector per argument.
fn broadcast_args(args: &[Variable], dims: &Dimensions) -> Result<Vec<Vec<f64>>, ArrayError> {
    args.iter()
        .map(|arg| {
            let values = arg.f64_values()?;
            let index = arg.dims().index_map(dims)?;
            Ok(index.iter().map(|&i| values[i]).collect())
        })
        .collect()
}

fn arg_dims(args: &[Variable]) -> Result<Dimensions, ArrayError> {
    args.iter()
        .try_fold(Dimensions::scalar(), |dims, arg| dims.merge(arg.dims()))
}

/// Result unit of applying `formula` to `target`, rejecting variances it cannot carry.
fn check_target(formula: Formula, target: &Variable, arg_units: &[Unit]) -> Result<Unit, ArrayError> {
    if target.variances().is_some() && !formula.propagates_variances() {
        return Err(ArrayError::VariancesUnsupported("non-linear coordinate conversion"));
    }
    kernel_for(target.dtype())?;
    formula.unit(target.unit(), arg_units)
}

fn transform(
    formula: Formula,
    target: &mut Variable,
    rows: &Rows,
    args: &[Vec<f64>],
    unit: Unit,
) -> Result<(), ArrayError> {
    let kernel = kernel_for(target.dtype())?;
    let (values, variances) = target.storage_mut();
    kernel(formula, values, variances, rows, args)?;
    target.set_unit(unit);
    Ok(())
}

fn transform_dense(
    formula: Formula,
    coord: &mut Variable,
    args: &[Variable],
    unit: Unit,
) -> Result<(), ArrayError> {
    let dims = arg_dims(args)?;
    if !coord.dims().contains_all(&dims) {
        // Geometry varies along dimensions the coordinate lacks, e.g. shared tof edges
        // converted with per-spectrum flight paths.
        let target = dims.merge(coord.dims())?;
        *coord = ops::broadcast(coord, &target)?;
    }
    let broadcast = broadcast_args(args, coord.dims())?;
    transform(formula, coord, &Rows::Dense, &broadcast, unit)
}

fn transform_binned(
    formula: Formula,
    mut view: BinnedViewMut<'_>,
    args: &[Variable],
    unit: Unit,
) -> Result<(), ArrayError> {
    let broadcast = broadcast_args(args, view.outer_dims())?;
    let (ranges, column) = view.parts_mut();
    let rows = Rows::from_ranges(ranges);
    transform(formula, column, &rows, &broadcast, unit)
}

/// Validate every target the conversion would touch, returning the units to assign.
fn plan<T: Measurement>(
    data: &T,
    from: &Dim,
    formula: Formula,
    args: &[Variable],
) -> Result<(Option<Unit>, Vec<Option<Unit>>), ArrayError> {
    let arg_units: Vec<Unit> = args.iter().map(Variable::unit).collect();
    let dense = data
        .coords()
        .get(from)
        .map(|coord| check_target(formula, coord, &arg_units))
        .transpose()?;
    let events = data
        .items()
        .map(|(_, item)| match item.data().bins() {
            Ok(bins) => bins
                .buffer()
                .coords()
                .get(from)
                .map(|column| check_target(formula, column, &arg_units))
                .transpose(),
            Err(_) => Ok(None),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((dense, events))
}

/// Apply `formula` with precomputed `args` to the `from` coordinate and rename it to `to`.
pub fn convert_generic<T: Measurement>(
    mut data: T,
    from: &Dim,
    to: &Dim,
    formula: Formula,
    args: &[Variable],
) -> Result<T, ConvertError> {
    if args.len() != formula.arity() {
        return Err(ArrayError::ShapeMismatch {
            dims: format!("{formula:?} arguments"),
            expected: formula.arity(),
            found: args.len(),
        }
        .into());
    }
    let (dense_unit, event_units) = plan(&data, from, formula, args)?;

    if let (Some(unit), Some(coord)) = (dense_unit, data.coords_mut().get_mut(from)) {
        tracing::trace!(coord = %from, dims = %coord.dims(), "transforming dense coordinate");
        transform_dense(formula, coord, args, unit)?;
    }

    for ((name, item), unit) in data.items_mut().zip(event_units) {
        let Some(unit) = unit else { continue };
        let (outer, bins) = item.data_mut().bins_parts_mut()?;
        let mut column = bins.buffer_mut().coords_mut().extract(from)?;
        tracing::trace!(item = name, events = column.dims().volume(), "transforming event coordinate");
        transform_binned(formula, BinnedViewMut::new(bins.ranges(), outer, &mut column)?, args, unit)?;
        bins.buffer_mut().coords_mut().insert(to.clone(), column);
    }

    data.rename_dim(from, to);
    Ok(data)
}

/// Multiply the `from` coordinate by `factor` and rename it to `to`.
pub fn convert_with_factor<T: Measurement>(
    data: T,
    from: &Dim,
    to: &Dim,
    factor: Variable,
) -> Result<T, ConvertError> {
    convert_generic(data, from, to, Formula::Scale, std::slice::from_ref(&factor))
}

#[cfg(test)]
mod tests {
    use neutron_array::{Bins, DataArray, units};

    use super::*;

    fn spectra(tof: Vec<f64>) -> DataArray {
        let data = Variable::new(
            Dimensions::new(vec![Dim::SPECTRUM, Dim::TOF], vec![2, tof.len()]).unwrap(),
            units::COUNTS,
            Values::F64(vec![1.0; 2 * tof.len()]),
        )
        .unwrap();
        DataArray::new("counts", data)
            .with_coord(Dim::TOF, Variable::array(Dim::TOF, units::US, tof))
            .unwrap()
    }

    #[test]
    fn shared_coordinate_gains_geometry_dimension() {
        let factor = Variable::array(Dim::SPECTRUM, units::ANGSTROM / units::US, vec![1.0, 2.0]);
        let out = convert_with_factor(spectra(vec![1.0, 2.0, 3.0]), &Dim::TOF, &Dim::WAVELENGTH, factor)
            .unwrap();
        let coord = out.coords().require(&Dim::WAVELENGTH).unwrap();
        assert_eq!(coord.unit(), units::ANGSTROM);
        assert_eq!(coord.dims().shape(), vec![2, 3]);
        assert_eq!(coord.f64_values().unwrap().to_vec(), vec![1.0, 2.0, 3.0, 2.0, 4.0, 6.0]);
        assert!(out.dims().contains(&Dim::WAVELENGTH));
    }

    #[test]
    fn variances_scale_with_square_of_factor() {
        let mut array = spectra(vec![1.0, 2.0]);
        let tof = Variable::array(Dim::TOF, units::US, vec![1.0, 2.0])
            .with_variances(vec![0.5, 0.5])
            .unwrap();
        array.set_coord(Dim::TOF, tof).unwrap();
        let factor = Variable::scalar(3.0, units::ANGSTROM / units::US);
        let out = convert_with_factor(array, &Dim::TOF, &Dim::WAVELENGTH, factor).unwrap();
        let coord = out.coords().require(&Dim::WAVELENGTH).unwrap();
        assert_eq!(coord.variances().unwrap().to_vec(), vec![4.5, 4.5]);
    }

    #[test]
    fn non_linear_formula_rejects_variances() {
        let mut array = spectra(vec![1.0, 2.0]);
        let tof = Variable::array(Dim::TOF, units::US, vec![1.0, 2.0])
            .with_variances(vec![0.5, 0.5])
            .unwrap();
        array.set_coord(Dim::TOF, tof).unwrap();
        let c = Variable::scalar(1.0, units::MEV * units::US * units::US);
        let err = convert_generic(array, &Dim::TOF, &Dim::ENERGY, Formula::TofToEnergy, &[c]);
        assert!(matches!(err, Err(ConvertError::Array(ArrayError::VariancesUnsupported(_)))));
    }

    #[test]
    fn float32_events_stay_float32() {
        let buffer = DataArray::new("events", Variable::array(Dim::EVENT, units::COUNTS, vec![1.0; 3]))
            .with_coord(
                Dim::TOF,
                Variable::new(
                    Dimensions::one(Dim::EVENT, 3),
                    units::US,
                    Values::F32(vec![1.0, 2.0, 4.0]),
                )
                .unwrap(),
            )
            .unwrap();
        let bins = Bins::from_sizes(&[1, 2], Dim::EVENT, buffer).unwrap();
        let data = Variable::binned(Dimensions::one(Dim::SPECTRUM, 2), bins).unwrap();
        let array = DataArray::new("events", data);
        let factor = Variable::array(Dim::SPECTRUM, units::ANGSTROM / units::US, vec![1.0, 0.5]);
        let out = convert_with_factor(array, &Dim::TOF, &Dim::WAVELENGTH, factor).unwrap();
        let buffer = out.data().bins().unwrap().buffer();
        let column = buffer.coords().require(&Dim::WAVELENGTH).unwrap();
        assert_eq!(column.dtype(), DType::Float32);
        assert_eq!(column.unit(), units::ANGSTROM);
        assert_eq!(column.f64_values().unwrap().to_vec(), vec![1.0, 1.0, 2.0]);
        assert!(!buffer.coords().contains(&Dim::TOF));
    }
}
