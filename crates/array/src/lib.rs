//! Labeled-array runtime: named dimensions, unit-carrying variables, datasets and event buffers.
//!
//! The conversion crates only rely on what is exposed here: coordinate and attribute maps,
//! renaming, broadcasting, unit arithmetic, and borrowed views over binned event data.

pub mod bins;
pub mod coords;
pub mod data_array;
pub mod dim;
pub mod dimensions;
pub mod error;
pub mod ops;
pub mod variable;

pub use bins::{BinnedViewMut, Bins};
pub use coords::Coords;
pub use data_array::{DataArray, Dataset, Item, Measurement, Meta};
pub use dim::Dim;
pub use dimensions::Dimensions;
pub use error::ArrayError;
pub use variable::{DType, Values, Variable};

pub use neutron_core::units::{self, Unit};
pub use neutron_core::vector::Vector3;
