//! Elementwise operations with broadcasting and unit arithmetic.
//!
//! Binary operations broadcast both operands to the union of their dimensions. Float32
//! inputs are read as float64 and results are always float64. Operands carrying variances
//! are rejected; only the conversion engine propagates variances.

use neutron_core::units::{self, Unit};
use neutron_core::vector::{self, Vector3};

use crate::dimensions::Dimensions;
use crate::error::ArrayError;
use crate::variable::{Values, Variable};

fn reject_variances(op: &'static str, operands: &[&Variable]) -> Result<(), ArrayError> {
    if operands.iter().any(|v| v.variances().is_some()) {
        return Err(ArrayError::VariancesUnsupported(op));
    }
    Ok(())
}

fn expect_same_unit(op: &'static str, a: &Variable, b: &Variable) -> Result<Unit, ArrayError> {
    if a.unit() != b.unit() {
        return Err(ArrayError::UnitMismatch {
            op,
            expected: a.unit(),
            found: b.unit(),
        });
    }
    Ok(a.unit())
}

fn zip_map<A: Copy, B: Copy, R>(
    a_dims: &Dimensions,
    a: &[A],
    b_dims: &Dimensions,
    b: &[B],
    f: impl Fn(A, B) -> R,
) -> Result<(Dimensions, Vec<R>), ArrayError> {
    let dims = a_dims.merge(b_dims)?;
    let ia = a_dims.index_map(&dims)?;
    let ib = b_dims.index_map(&dims)?;
    let out = ia.iter().zip(&ib).map(|(&i, &j)| f(a[i], b[j])).collect();
    Ok((dims, out))
}

fn float_binary(
    op: &'static str,
    a: &Variable,
    b: &Variable,
    unit: Unit,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Variable, ArrayError> {
    reject_variances(op, &[a, b])?;
    let (x, y) = (a.f64_values()?, b.f64_values()?);
    let (dims, out) = zip_map(a.dims(), &x[..], b.dims(), &y[..], f)?;
    Variable::new(dims, unit, Values::F64(out))
}

fn float_unary(
    op: &'static str,
    a: &Variable,
    unit: Unit,
    f: impl Fn(f64) -> f64,
) -> Result<Variable, ArrayError> {
    reject_variances(op, &[a])?;
    let out = a.f64_values()?.iter().map(|&x| f(x)).collect();
    Variable::new(a.dims().clone(), unit, Values::F64(out))
}

pub fn add(a: &Variable, b: &Variable) -> Result<Variable, ArrayError> {
    let unit = expect_same_unit("add", a, b)?;
    float_binary("add", a, b, unit, |x, y| x + y)
}

/// Difference of floats, or of 3-vectors when both operands hold vectors.
pub fn sub(a: &Variable, b: &Variable) -> Result<Variable, ArrayError> {
    let unit = expect_same_unit("sub", a, b)?;
    if let (Values::Vector3(x), Values::Vector3(y)) = (a.values(), b.values()) {
        let (dims, out) = zip_map(
            a.dims(),
            x.as_slice(),
            b.dims(),
            y.as_slice(),
            |p: Vector3, q: Vector3| vector::sub(&p, &q),
        )?;
        return Variable::new(dims, unit, Values::Vector3(out));
    }
    float_binary("sub", a, b, unit, |x, y| x - y)
}

pub fn mul(a: &Variable, b: &Variable) -> Result<Variable, ArrayError> {
    float_binary("mul", a, b, a.unit() * b.unit(), |x, y| x * y)
}

pub fn div(a: &Variable, b: &Variable) -> Result<Variable, ArrayError> {
    float_binary("div", a, b, a.unit() / b.unit(), |x, y| x / y)
}

/// Multiply by a dimensionless constant.
pub fn scale(a: &Variable, factor: f64) -> Result<Variable, ArrayError> {
    float_unary("scale", a, a.unit(), |x| x * factor)
}

pub fn neg(a: &Variable) -> Result<Variable, ArrayError> {
    float_unary("neg", a, a.unit(), |x| -x)
}

pub fn reciprocal(a: &Variable) -> Result<Variable, ArrayError> {
    float_unary("reciprocal", a, a.unit().reciprocal(), |x| 1.0 / x)
}

pub fn sqrt(a: &Variable) -> Result<Variable, ArrayError> {
    float_unary("sqrt", a, a.unit().sqrt()?, f64::sqrt)
}

fn angle_in_radians(op: &'static str, a: &Variable) -> Result<f64, ArrayError> {
    if !a.unit().is_angle() {
        return Err(ArrayError::UnitMismatch {
            op,
            expected: units::RAD,
            found: a.unit(),
        });
    }
    Ok(a.unit().scale())
}

pub fn cos(a: &Variable) -> Result<Variable, ArrayError> {
    let to_rad = angle_in_radians("cos", a)?;
    float_unary("cos", a, units::ONE, |x| (x * to_rad).cos())
}

pub fn sin(a: &Variable) -> Result<Variable, ArrayError> {
    let to_rad = angle_in_radians("sin", a)?;
    float_unary("sin", a, units::ONE, |x| (x * to_rad).sin())
}

pub fn acos(a: &Variable) -> Result<Variable, ArrayError> {
    if !a.unit().is_dimensionless() {
        return Err(ArrayError::UnitMismatch {
            op: "acos",
            expected: units::ONE,
            found: a.unit(),
        });
    }
    let to_one = a.unit().scale();
    // Dot products of unit vectors can overshoot ±1 by rounding.
    float_unary("acos", a, units::RAD, |x| (x * to_one).clamp(-1.0, 1.0).acos())
}

pub fn norm(a: &Variable) -> Result<Variable, ArrayError> {
    let out = a.vector_values()?.iter().map(vector::norm).collect();
    Variable::new(a.dims().clone(), a.unit(), Values::F64(out))
}

pub fn dot(a: &Variable, b: &Variable) -> Result<Variable, ArrayError> {
    let (dims, out) = zip_map(
        a.dims(),
        a.vector_values()?,
        b.dims(),
        b.vector_values()?,
        |p: Vector3, q: Vector3| vector::dot(&p, &q),
    )?;
    Variable::new(dims, a.unit() * b.unit(), Values::F64(out))
}

/// `norm(a - b)` in one pass, without materializing the difference vectors.
pub fn distance(a: &Variable, b: &Variable) -> Result<Variable, ArrayError> {
    let unit = expect_same_unit("distance", a, b)?;
    let (dims, out) = zip_map(
        a.dims(),
        a.vector_values()?,
        b.dims(),
        b.vector_values()?,
        |p: Vector3, q: Vector3| vector::distance(&p, &q),
    )?;
    Variable::new(dims, unit, Values::F64(out))
}

/// Dimensionless unit vectors pointing from `from` towards `to`.
pub fn direction(from: &Variable, to: &Variable) -> Result<Variable, ArrayError> {
    expect_same_unit("direction", from, to)?;
    let (dims, out) = zip_map(
        from.dims(),
        from.vector_values()?,
        to.dims(),
        to.vector_values()?,
        |p: Vector3, q: Vector3| vector::direction(&p, &q),
    )?;
    Variable::new(dims, units::ONE, Values::Vector3(out))
}

/// Copy `a` so that it spans `target`, which must contain all of `a`'s dimensions.
pub fn broadcast(a: &Variable, target: &Dimensions) -> Result<Variable, ArrayError> {
    let index = a.dims().index_map(target)?;
    let values = match a.values() {
        Values::F64(v) => Values::F64(index.iter().map(|&i| v[i]).collect()),
        Values::F32(v) => Values::F32(index.iter().map(|&i| v[i]).collect()),
        Values::Vector3(v) => Values::Vector3(index.iter().map(|&i| v[i]).collect()),
        Values::Bins(_) => {
            return Err(ArrayError::DTypeMismatch {
                expected: crate::variable::DType::Float64,
                found: a.dtype(),
            });
        }
    };
    let out = Variable::new(target.clone(), a.unit(), values)?;
    match a.variances() {
        Some(variances) => out.with_variances(index.iter().map(|&i| variances[i]).collect()),
        None => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dim::Dim;

    #[test]
    fn binary_ops_broadcast_and_combine_units() {
        let a = Variable::array(Dim::SPECTRUM, units::M, vec![1.0, 2.0]);
        let b = Variable::scalar(4.0, units::S);
        let q = div(&a, &b).unwrap();
        assert_eq!(q.unit(), units::M / units::S);
        assert_eq!(q.f64_values().unwrap().to_vec(), vec![0.25, 0.5]);
    }

    #[test]
    fn add_requires_matching_units() {
        let a = Variable::scalar(1.0, units::M);
        let b = Variable::scalar(1.0, units::S);
        assert!(matches!(add(&a, &b), Err(ArrayError::UnitMismatch { .. })));
    }

    #[test]
    fn distance_matches_norm_of_difference() {
        let a = Variable::vectors(Dim::SPECTRUM, units::M, vec![[1.0, 0.0, 0.0], [0.0, 3.0, 4.0]]);
        let b = Variable::vector([0.0, 0.0, 0.0], units::M);
        let fused = distance(&a, &b).unwrap();
        let unfused = norm(&sub(&a, &b).unwrap()).unwrap();
        assert_eq!(fused, unfused);
        assert_eq!(fused.f64_values().unwrap().to_vec(), vec![1.0, 5.0]);
    }

    #[test]
    fn cos_honours_degrees() {
        let angle = Variable::scalar(60.0, units::DEG);
        let c = cos(&angle).unwrap().value().unwrap();
        assert!((c - 0.5).abs() < 1e-12);
    }

    #[test]
    fn acos_tolerates_rounding_past_unity() {
        let forward = acos(&Variable::scalar(1.0 + 4.0 * f64::EPSILON, units::ONE)).unwrap();
        assert_eq!(forward.value().unwrap(), 0.0);
        let backward = acos(&Variable::scalar(-1.0 - 4.0 * f64::EPSILON, units::ONE)).unwrap();
        assert_eq!(backward.value().unwrap(), std::f64::consts::PI);
    }

    #[test]
    fn broadcast_keeps_variances() {
        let a = Variable::array(Dim::TOF, units::US, vec![1.0, 2.0])
            .with_variances(vec![0.1, 0.2])
            .unwrap();
        let target = Dimensions::new(vec![Dim::SPECTRUM, Dim::TOF], vec![2, 2]).unwrap();
        let b = broadcast(&a, &target).unwrap();
        assert_eq!(b.variances().unwrap().to_vec(), vec![0.1, 0.2, 0.1, 0.2]);
    }
}
