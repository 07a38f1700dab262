//! Time-of-flight coordinate conversion for neutron scattering data.
//!
//! The workspace is split the way the data flows: `neutron_core` holds units and
//! physical constants, `neutron_array` the labeled arrays and event buffers,
//! `neutron_beamline` the geometry derived from positions, and `neutron_conversions`
//! the factor library, engine and dispatcher. Manifests and exports live in
//! `neutron_config` and `neutron_export`; front-ends only need this facade.

pub use neutron_array as array;
pub use neutron_beamline as beamline;
pub use neutron_config as config;
pub use neutron_conversions as conversions;
pub use neutron_core::{constants, units};
pub use neutron_export as export;

pub use neutron_array::{DataArray, Dataset, Dim, Measurement, Variable};
pub use neutron_conversions::{ConvertError, ConvertMode, convert, convert_view, convert_with_mode};

