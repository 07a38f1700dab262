//! Single-item data arrays and multi-item datasets sharing coordinates.

use std::collections::BTreeMap;

use neutron_core::Unit;

use crate::coords::Coords;
use crate::dim::Dim;
use crate::dimensions::Dimensions;
use crate::error::ArrayError;
use crate::variable::Variable;

/// Data plus item-local attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    data: Variable,
    attrs: Coords,
}

impl Item {
    pub fn new(data: Variable) -> Self {
        Self {
            data,
            attrs: Coords::new(),
        }
    }

    pub fn data(&self) -> &Variable {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Variable {
        &mut self.data
    }

    pub fn attrs(&self) -> &Coords {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Coords {
        &mut self.attrs
    }

    pub fn unit(&self) -> Unit {
        self.data.unit()
    }

    pub fn dims(&self) -> &Dimensions {
        self.data.dims()
    }

    fn rename_dim(&mut self, from: &Dim, to: &Dim) {
        self.data.rename_dim(from, to);
        self.attrs.rename_dim(from, to);
    }
}

/// Read-only lookup over coordinates, falling back to item attributes where they exist.
#[derive(Debug, Clone, Copy)]
pub struct Meta<'a> {
    coords: &'a Coords,
    attrs: Option<&'a Coords>,
}

impl<'a> Meta<'a> {
    pub fn new(coords: &'a Coords, attrs: Option<&'a Coords>) -> Self {
        Self { coords, attrs }
    }

    pub fn get(&self, dim: &Dim) -> Option<&'a Variable> {
        self.coords
            .get(dim)
            .or_else(|| self.attrs.and_then(|attrs| attrs.get(dim)))
    }

    pub fn require(&self, dim: &Dim) -> Result<&'a Variable, ArrayError> {
        self.get(dim).ok_or_else(|| ArrayError::NotFound(dim.clone()))
    }

    pub fn contains(&self, dim: &Dim) -> bool {
        self.get(dim).is_some()
    }
}

/// Container shape the conversion core operates on: a single array or a dataset.
pub trait Measurement: Clone {
    fn coords(&self) -> &Coords;

    fn coords_mut(&mut self) -> &mut Coords;

    /// Coordinates, plus attributes when the container holds exactly one item.
    fn meta(&self) -> Meta<'_>;

    fn items(&self) -> impl Iterator<Item = (&str, &Item)>;

    fn items_mut(&mut self) -> impl Iterator<Item = (&str, &mut Item)>;

    /// Rename a dimension everywhere, including the coordinate keyed by it.
    fn rename_dim(&mut self, from: &Dim, to: &Dim);
}

/// Each coordinate dimension must be a data dimension, or one longer (bin edges).
fn validate_coord(data_dims: &Dimensions, key: &Dim, coord: &Variable) -> Result<(), ArrayError> {
    for (dim, extent) in coord.dims().iter() {
        match data_dims.extent(dim) {
            Some(data_extent) if extent == data_extent || extent == data_extent + 1 => {}
            _ => {
                return Err(ArrayError::DimensionMismatch {
                    expected: format!("coordinate `{key}` within {data_dims}"),
                    found: coord.dims().to_string(),
                });
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    name: String,
    coords: Coords,
    item: Item,
}

impl DataArray {
    pub fn new(name: impl Into<String>, data: Variable) -> Self {
        Self {
            name: name.into(),
            coords: Coords::new(),
            item: Item::new(data),
        }
    }

    pub fn with_coord(mut self, dim: Dim, coord: Variable) -> Result<Self, ArrayError> {
        self.set_coord(dim, coord)?;
        Ok(self)
    }

    pub fn with_attr(mut self, dim: Dim, attr: Variable) -> Result<Self, ArrayError> {
        validate_coord(self.dims(), &dim, &attr)?;
        self.item.attrs.insert(dim, attr);
        Ok(self)
    }

    pub fn set_coord(&mut self, dim: Dim, coord: Variable) -> Result<(), ArrayError> {
        validate_coord(self.dims(), &dim, &coord)?;
        self.coords.insert(dim, coord);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Variable {
        self.item.data()
    }

    pub fn data_mut(&mut self) -> &mut Variable {
        self.item.data_mut()
    }

    pub fn attrs(&self) -> &Coords {
        self.item.attrs()
    }

    pub fn attrs_mut(&mut self) -> &mut Coords {
        self.item.attrs_mut()
    }

    pub fn dims(&self) -> &Dimensions {
        self.item.dims()
    }

    pub fn unit(&self) -> Unit {
        self.item.unit()
    }
}

impl Measurement for DataArray {
    fn coords(&self) -> &Coords {
        &self.coords
    }

    fn coords_mut(&mut self) -> &mut Coords {
        &mut self.coords
    }

    fn meta(&self) -> Meta<'_> {
        Meta::new(&self.coords, Some(&self.item.attrs))
    }

    fn items(&self) -> impl Iterator<Item = (&str, &Item)> {
        std::iter::once((self.name.as_str(), &self.item))
    }

    fn items_mut(&mut self) -> impl Iterator<Item = (&str, &mut Item)> {
        std::iter::once((self.name.as_str(), &mut self.item))
    }

    fn rename_dim(&mut self, from: &Dim, to: &Dim) {
        self.coords.rename_dim(from, to);
        self.item.rename_dim(from, to);
    }
}

/// Named items sharing one set of coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    coords: Coords,
    items: BTreeMap<String, Item>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, name: impl Into<String>, data: Variable) -> Result<Self, ArrayError> {
        self.set_item(name, data)?;
        Ok(self)
    }

    pub fn with_coord(mut self, dim: Dim, coord: Variable) -> Result<Self, ArrayError> {
        self.set_coord(dim, coord)?;
        Ok(self)
    }

    /// Insert or replace an item; its dimensions must agree with existing extents.
    pub fn set_item(&mut self, name: impl Into<String>, data: Variable) -> Result<(), ArrayError> {
        self.dims()?.merge(data.dims())?;
        self.items.insert(name.into(), Item::new(data));
        Ok(())
    }

    pub fn set_coord(&mut self, dim: Dim, coord: Variable) -> Result<(), ArrayError> {
        validate_coord(&self.dims()?, &dim, &coord)?;
        self.coords.insert(dim, coord);
        Ok(())
    }

    pub fn set_attr(&mut self, item: &str, dim: Dim, attr: Variable) -> Result<(), ArrayError> {
        let item = self.item_mut(item)?;
        validate_coord(item.dims(), &dim, &attr)?;
        item.attrs.insert(dim, attr);
        Ok(())
    }

    pub fn item(&self, name: &str) -> Result<&Item, ArrayError> {
        self.items
            .get(name)
            .ok_or_else(|| ArrayError::ItemNotFound(name.to_string()))
    }

    pub fn item_mut(&mut self, name: &str) -> Result<&mut Item, ArrayError> {
        self.items
            .get_mut(name)
            .ok_or_else(|| ArrayError::ItemNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Union of all item dimensions.
    pub fn dims(&self) -> Result<Dimensions, ArrayError> {
        self.items
            .values()
            .try_fold(Dimensions::scalar(), |dims, item| dims.merge(item.dims()))
    }
}

impl From<DataArray> for Dataset {
    fn from(array: DataArray) -> Self {
        let mut items = BTreeMap::new();
        items.insert(array.name, array.item);
        Self {
            coords: array.coords,
            items,
        }
    }
}

impl Measurement for Dataset {
    fn coords(&self) -> &Coords {
        &self.coords
    }

    fn coords_mut(&mut self) -> &mut Coords {
        &mut self.coords
    }

    fn meta(&self) -> Meta<'_> {
        Meta::new(&self.coords, None)
    }

    fn items(&self) -> impl Iterator<Item = (&str, &Item)> {
        self.items.iter().map(|(name, item)| (name.as_str(), item))
    }

    fn items_mut(&mut self) -> impl Iterator<Item = (&str, &mut Item)> {
        self.items.iter_mut().map(|(name, item)| (name.as_str(), item))
    }

    fn rename_dim(&mut self, from: &Dim, to: &Dim) {
        self.coords.rename_dim(from, to);
        for item in self.items.values_mut() {
            item.rename_dim(from, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use neutron_core::units;

    use super::*;

    #[test]
    fn coords_may_be_bin_edges() {
        let data = Variable::array(Dim::TOF, units::COUNTS, vec![1.0, 2.0, 3.0]);
        let edges = Variable::array(Dim::TOF, units::US, vec![0.0, 1.0, 2.0, 3.0]);
        assert!(DataArray::new("a", data.clone()).with_coord(Dim::TOF, edges).is_ok());
        let too_long = Variable::array(Dim::TOF, units::US, vec![0.0; 5]);
        assert!(DataArray::new("a", data).with_coord(Dim::TOF, too_long).is_err());
    }

    #[test]
    fn rename_moves_coordinate_key() {
        let data = Variable::array(Dim::TOF, units::COUNTS, vec![1.0, 2.0]);
        let mut array = DataArray::new("a", data)
            .with_coord(Dim::TOF, Variable::array(Dim::TOF, units::US, vec![1.0, 2.0]))
            .unwrap();
        array.rename_dim(&Dim::TOF, &Dim::WAVELENGTH);
        assert!(!array.coords().contains(&Dim::TOF));
        let coord = array.coords().require(&Dim::WAVELENGTH).unwrap();
        assert!(coord.dims().contains(&Dim::WAVELENGTH));
        assert!(array.dims().contains(&Dim::WAVELENGTH));
    }

    #[test]
    fn dataset_rejects_conflicting_extents() {
        let ds = Dataset::new()
            .with_item("a", Variable::array(Dim::SPECTRUM, units::COUNTS, vec![1.0, 2.0]))
            .unwrap();
        let clash = Variable::array(Dim::SPECTRUM, units::COUNTS, vec![1.0, 2.0, 3.0]);
        assert!(ds.with_item("b", clash).is_err());
    }
}
