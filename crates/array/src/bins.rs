//! Event buffers: ragged per-element lists stored as ranges into a flat data array.

use std::ops::Range;

use neutron_core::Unit;

use crate::data_array::DataArray;
use crate::dim::Dim;
use crate::dimensions::Dimensions;
use crate::error::ArrayError;
use crate::variable::Variable;

/// Ranges into a shared flat buffer, one per element of the owning variable.
///
/// Ranges are disjoint, in emission order, and cover the buffer without gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    ranges: Vec<(usize, usize)>,
    dim: Dim,
    buffer: DataArray,
}

impl Bins {
    pub fn new(ranges: Vec<(usize, usize)>, dim: Dim, buffer: DataArray) -> Result<Self, ArrayError> {
        let buffer_dims = buffer.dims();
        if buffer_dims.ndim() != 1 || !buffer_dims.contains(&dim) {
            return Err(ArrayError::DimensionMismatch {
                expected: format!("[{dim}: _]"),
                found: buffer_dims.to_string(),
            });
        }
        let len = buffer_dims.volume();
        validate_ranges(&ranges, len)?;
        Ok(Self { ranges, dim, buffer })
    }

    /// Build ranges from per-element event counts.
    pub fn from_sizes(sizes: &[usize], dim: Dim, buffer: DataArray) -> Result<Self, ArrayError> {
        let mut begin = 0;
        let ranges = sizes
            .iter()
            .map(|size| {
                let range = (begin, begin + size);
                begin += size;
                range
            })
            .collect();
        Self::new(ranges, dim, buffer)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(usize, usize)] {
        &self.ranges
    }

    pub fn range(&self, index: usize) -> Option<Range<usize>> {
        self.ranges.get(index).map(|&(begin, end)| begin..end)
    }

    pub fn dim(&self) -> &Dim {
        &self.dim
    }

    pub fn buffer(&self) -> &DataArray {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut DataArray {
        &mut self.buffer
    }

    pub fn unit(&self) -> Unit {
        self.buffer.unit()
    }
}

fn validate_ranges(ranges: &[(usize, usize)], len: usize) -> Result<(), ArrayError> {
    let mut expected_begin = 0;
    for (i, &(begin, end)) in ranges.iter().enumerate() {
        if begin != expected_begin || end < begin {
            return Err(ArrayError::InvalidBinIndices(format!(
                "range {i} is ({begin}, {end}) but must start at {expected_begin}"
            )));
        }
        expected_begin = end;
    }
    if expected_begin != len {
        return Err(ArrayError::InvalidBinIndices(format!(
            "ranges cover {expected_begin} events, buffer holds {len}"
        )));
    }
    Ok(())
}

/// Borrowed view of one buffer column, indexed through the outer ranges.
///
/// The column is usually extracted from the buffer for the duration of a transform and
/// stored back afterwards; the view cannot outlive either borrow.
#[derive(Debug)]
pub struct BinnedViewMut<'a> {
    ranges: &'a [(usize, usize)],
    outer: &'a Dimensions,
    column: &'a mut Variable,
}

impl<'a> BinnedViewMut<'a> {
    pub fn new(
        ranges: &'a [(usize, usize)],
        outer: &'a Dimensions,
        column: &'a mut Variable,
    ) -> Result<Self, ArrayError> {
        if ranges.len() != outer.volume() {
            return Err(ArrayError::ShapeMismatch {
                dims: outer.to_string(),
                expected: outer.volume(),
                found: ranges.len(),
            });
        }
        let covered = ranges.last().map_or(0, |&(_, end)| end);
        if column.dims().ndim() != 1 || column.dims().volume() != covered {
            return Err(ArrayError::InvalidBinIndices(format!(
                "column {} does not match ranges covering {covered} events",
                column.dims()
            )));
        }
        Ok(Self {
            ranges,
            outer,
            column,
        })
    }

    pub fn outer_dims(&self) -> &Dimensions {
        self.outer
    }

    pub fn ranges(&self) -> &[(usize, usize)] {
        self.ranges
    }

    /// Ranges and column borrowed together, for kernels that walk bin by bin.
    pub fn parts_mut(&mut self) -> (&[(usize, usize)], &mut Variable) {
        (self.ranges, &mut *self.column)
    }
}
