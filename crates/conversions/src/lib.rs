//! Conversions between flight time and the physical axes derived from it: d-spacing,
//! wavelength, energy, energy transfer and momentum transfer Q.
//!
//! ```no_run
//! use neutron_array::{DataArray, Dim};
//! # fn load() -> DataArray { unimplemented!() }
//! let data = load();
//! let converted = neutron_conversions::convert(data, &Dim::TOF, &Dim::WAVELENGTH)?;
//! # Ok::<(), neutron_conversions::ConvertError>(())
//! ```

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod factors;
pub mod formula;
pub mod relocate;

pub use dispatch::{HUB, convert, convert_view, convert_with_mode, is_direct};
pub use error::{ConvertError, InelasticConflict};
pub use formula::Formula;
pub use neutron_beamline::ConvertMode;
