//! Unit-carrying multi-dimensional variables.

use std::borrow::Cow;

use neutron_core::units::{Quantity, Unit};
use neutron_core::vector::Vector3;

use crate::bins::Bins;
use crate::dim::Dim;
use crate::dimensions::Dimensions;
use crate::error::ArrayError;

/// Concrete element representation of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Float64,
    Float32,
    Vector3,
    Bins,
}

/// Flat, row-major element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    F64(Vec<f64>),
    F32(Vec<f32>),
    Vector3(Vec<Vector3>),
    Bins(Box<Bins>),
}

impl Values {
    pub fn dtype(&self) -> DType {
        match self {
            Values::F64(_) => DType::Float64,
            Values::F32(_) => DType::Float32,
            Values::Vector3(_) => DType::Vector3,
            Values::Bins(_) => DType::Bins,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::F64(v) => v.len(),
            Values::F32(v) => v.len(),
            Values::Vector3(v) => v.len(),
            Values::Bins(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    dims: Dimensions,
    unit: Unit,
    values: Values,
    variances: Option<Vec<f64>>,
}

impl Variable {
    pub fn new(dims: Dimensions, unit: Unit, values: Values) -> Result<Self, ArrayError> {
        if values.len() != dims.volume() {
            return Err(ArrayError::ShapeMismatch {
                dims: dims.to_string(),
                expected: dims.volume(),
                found: values.len(),
            });
        }
        Ok(Self {
            dims,
            unit,
            values,
            variances: None,
        })
    }

    pub fn scalar(value: f64, unit: Unit) -> Self {
        Self {
            dims: Dimensions::scalar(),
            unit,
            values: Values::F64(vec![value]),
            variances: None,
        }
    }

    pub fn vector(value: Vector3, unit: Unit) -> Self {
        Self {
            dims: Dimensions::scalar(),
            unit,
            values: Values::Vector3(vec![value]),
            variances: None,
        }
    }

    /// One-dimensional float64 variable.
    pub fn array(dim: Dim, unit: Unit, values: Vec<f64>) -> Self {
        Self {
            dims: Dimensions::one(dim, values.len()),
            unit,
            values: Values::F64(values),
            variances: None,
        }
    }

    /// One-dimensional variable of 3-vectors.
    pub fn vectors(dim: Dim, unit: Unit, values: Vec<Vector3>) -> Self {
        Self {
            dims: Dimensions::one(dim, values.len()),
            unit,
            values: Values::Vector3(values),
            variances: None,
        }
    }

    /// Binned variable holding one event range per element of `dims`.
    pub fn binned(dims: Dimensions, bins: Bins) -> Result<Self, ArrayError> {
        let unit = bins.buffer().unit();
        Self::new(dims, unit, Values::Bins(Box::new(bins)))
    }

    pub fn with_variances(mut self, variances: Vec<f64>) -> Result<Self, ArrayError> {
        if !matches!(self.dtype(), DType::Float64 | DType::Float32) {
            return Err(ArrayError::VariancesUnsupported("non-float variable"));
        }
        if variances.len() != self.dims.volume() {
            return Err(ArrayError::ShapeMismatch {
                dims: self.dims.to_string(),
                expected: self.dims.volume(),
                found: variances.len(),
            });
        }
        self.variances = Some(variances);
        Ok(self)
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Unit of the elements; for binned data this is the unit of the event weights.
    pub fn unit(&self) -> Unit {
        match &self.values {
            Values::Bins(bins) => bins.buffer().unit(),
            _ => self.unit,
        }
    }

    pub fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Values {
        &mut self.values
    }

    pub fn variances(&self) -> Option<&[f64]> {
        self.variances.as_deref()
    }

    /// Mutable element storage together with the variances, for in-place kernels.
    pub fn storage_mut(&mut self) -> (&mut Values, Option<&mut Vec<f64>>) {
        (&mut self.values, self.variances.as_mut())
    }

    pub fn rename_dim(&mut self, from: &Dim, to: &Dim) {
        self.dims.rename(from, to);
    }

    /// Float elements, upgrading float32 storage to float64.
    pub fn f64_values(&self) -> Result<Cow<'_, [f64]>, ArrayError> {
        match &self.values {
            Values::F64(v) => Ok(Cow::Borrowed(v.as_slice())),
            Values::F32(v) => Ok(Cow::Owned(v.iter().map(|x| f64::from(*x)).collect())),
            other => Err(ArrayError::DTypeMismatch {
                expected: DType::Float64,
                found: other.dtype(),
            }),
        }
    }

    pub fn vector_values(&self) -> Result<&[Vector3], ArrayError> {
        match &self.values {
            Values::Vector3(v) => Ok(v.as_slice()),
            other => Err(ArrayError::DTypeMismatch {
                expected: DType::Vector3,
                found: other.dtype(),
            }),
        }
    }

    pub fn bins(&self) -> Result<&Bins, ArrayError> {
        match &self.values {
            Values::Bins(bins) => Ok(bins.as_ref()),
            other => Err(ArrayError::DTypeMismatch {
                expected: DType::Bins,
                found: other.dtype(),
            }),
        }
    }

    /// Outer dimensions and the event buffer of a binned variable, borrowed separately.
    pub fn bins_parts_mut(&mut self) -> Result<(&Dimensions, &mut Bins), ArrayError> {
        match &mut self.values {
            Values::Bins(bins) => Ok((&self.dims, bins.as_mut())),
            other => Err(ArrayError::DTypeMismatch {
                expected: DType::Bins,
                found: other.dtype(),
            }),
        }
    }

    /// Single float value of a zero-dimensional variable.
    pub fn value(&self) -> Result<f64, ArrayError> {
        let values = self.f64_values()?;
        match &*values {
            [single] => Ok(*single),
            _ => Err(ArrayError::DimensionMismatch {
                expected: "scalar".to_string(),
                found: self.dims.to_string(),
            }),
        }
    }
}

impl From<Quantity> for Variable {
    fn from(quantity: Quantity) -> Self {
        Variable::scalar(quantity.value, quantity.unit)
    }
}
