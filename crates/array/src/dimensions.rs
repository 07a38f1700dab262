//! Ordered dimension labels with extents, and broadcast index mapping.

use std::fmt;

use crate::dim::Dim;
use crate::error::ArrayError;

/// Ordered list of `(dim, extent)` pairs; the last dimension is the fastest-varying.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dimensions {
    entries: Vec<(Dim, usize)>,
}

impl Dimensions {
    pub fn new(labels: Vec<Dim>, shape: Vec<usize>) -> Result<Self, ArrayError> {
        if labels.len() != shape.len() {
            return Err(ArrayError::DimensionMismatch {
                expected: format!("{} extents", labels.len()),
                found: format!("{} extents", shape.len()),
            });
        }
        let mut dims = Dimensions::scalar();
        for (dim, extent) in labels.into_iter().zip(shape) {
            if dims.contains(&dim) {
                return Err(ArrayError::DimensionMismatch {
                    expected: "unique dimension labels".to_string(),
                    found: format!("duplicate `{dim}`"),
                });
            }
            dims.entries.push((dim, extent));
        }
        Ok(dims)
    }

    /// Zero-dimensional (single element) dimensions.
    pub fn scalar() -> Self {
        Self::default()
    }

    pub fn one(dim: Dim, extent: usize) -> Self {
        Self {
            entries: vec![(dim, extent)],
        }
    }

    pub fn ndim(&self) -> usize {
        self.entries.len()
    }

    pub fn volume(&self) -> usize {
        self.entries.iter().map(|(_, extent)| extent).product()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Dim, usize)> {
        self.entries.iter().map(|(dim, extent)| (dim, *extent))
    }

    pub fn labels(&self) -> impl Iterator<Item = &Dim> {
        self.entries.iter().map(|(dim, _)| dim)
    }

    pub fn shape(&self) -> Vec<usize> {
        self.entries.iter().map(|(_, extent)| *extent).collect()
    }

    pub fn contains(&self, dim: &Dim) -> bool {
        self.position(dim).is_some()
    }

    pub fn extent(&self, dim: &Dim) -> Option<usize> {
        self.position(dim).map(|i| self.entries[i].1)
    }

    fn position(&self, dim: &Dim) -> Option<usize> {
        self.entries.iter().position(|(d, _)| d == dim)
    }

    /// True if every dimension of `other` is present here with the same extent.
    pub fn contains_all(&self, other: &Dimensions) -> bool {
        other
            .iter()
            .all(|(dim, extent)| self.extent(dim) == Some(extent))
    }

    /// Union of both label sets: `self` order first, then dimensions only found in `other`.
    pub fn merge(&self, other: &Dimensions) -> Result<Dimensions, ArrayError> {
        let mut merged = self.clone();
        for (dim, extent) in other.iter() {
            match merged.extent(dim) {
                Some(existing) if existing != extent => {
                    return Err(ArrayError::DimensionMismatch {
                        expected: format!("{dim}: {existing}"),
                        found: format!("{dim}: {extent}"),
                    });
                }
                Some(_) => {}
                None => merged.entries.push((dim.clone(), extent)),
            }
        }
        Ok(merged)
    }

    pub fn rename(&mut self, from: &Dim, to: &Dim) {
        if let Some(i) = self.position(from) {
            self.entries[i].0 = to.clone();
        }
    }

    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.entries.len()];
        for i in (0..self.entries.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.entries[i + 1].1;
        }
        strides
    }

    /// For every flat element of `target`, the flat index of the matching element here.
    ///
    /// Dimensions missing from `self` are broadcast (stride zero).
    pub fn index_map(&self, target: &Dimensions) -> Result<Vec<usize>, ArrayError> {
        if !target.contains_all(self) {
            return Err(ArrayError::DimensionMismatch {
                expected: format!("subset of {target}"),
                found: self.to_string(),
            });
        }
        let strides = self.strides();
        let mapped: Vec<usize> = target
            .labels()
            .map(|dim| self.position(dim).map_or(0, |i| strides[i]))
            .collect();
        let shape = target.shape();
        let mut index = vec![0usize; shape.len()];
        let mut offsets = Vec::with_capacity(target.volume());
        for _ in 0..target.volume() {
            offsets.push(index.iter().zip(&mapped).map(|(i, s)| i * s).sum());
            for axis in (0..index.len()).rev() {
                index[axis] += 1;
                if index[axis] < shape[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        Ok(offsets)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (dim, extent)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dim}: {extent}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_order_and_rejects_conflicts() {
        let a = Dimensions::one(Dim::SPECTRUM, 2);
        let b = Dimensions::new(vec![Dim::TOF, Dim::SPECTRUM], vec![3, 2]).unwrap();
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.shape(), vec![2, 3]);
        assert!(a.merge(&Dimensions::one(Dim::SPECTRUM, 4)).is_err());
    }

    #[test]
    fn index_map_broadcasts_missing_dims() {
        let target = Dimensions::new(vec![Dim::SPECTRUM, Dim::TOF], vec![2, 3]).unwrap();
        let spectrum = Dimensions::one(Dim::SPECTRUM, 2);
        assert_eq!(spectrum.index_map(&target).unwrap(), vec![0, 0, 0, 1, 1, 1]);
        let tof = Dimensions::one(Dim::TOF, 3);
        assert_eq!(tof.index_map(&target).unwrap(), vec![0, 1, 2, 0, 1, 2]);
        let transposed = Dimensions::new(vec![Dim::TOF, Dim::SPECTRUM], vec![3, 2]).unwrap();
        assert_eq!(
            transposed.index_map(&target).unwrap(),
            vec![0, 2, 4, 1, 3, 5]
        );
        assert_eq!(Dimensions::scalar().index_map(&target).unwrap(), vec![0; 6]);
    }
}
