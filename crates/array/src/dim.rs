//! Dimension and field labels.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of a dimension, coordinate or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dim(Cow<'static, str>);

impl Dim {
    pub const TOF: Dim = Dim::fixed("tof");
    pub const DSPACING: Dim = Dim::fixed("dspacing");
    pub const WAVELENGTH: Dim = Dim::fixed("wavelength");
    pub const ENERGY: Dim = Dim::fixed("energy");
    pub const ENERGY_TRANSFER: Dim = Dim::fixed("energy_transfer");
    pub const Q: Dim = Dim::fixed("Q");
    pub const POSITION: Dim = Dim::fixed("position");
    pub const SOURCE_POSITION: Dim = Dim::fixed("source_position");
    pub const SAMPLE_POSITION: Dim = Dim::fixed("sample_position");
    pub const INCIDENT_ENERGY: Dim = Dim::fixed("incident_energy");
    pub const FINAL_ENERGY: Dim = Dim::fixed("final_energy");
    pub const SPECTRUM: Dim = Dim::fixed("spectrum");
    pub const EVENT: Dim = Dim::fixed("event");

    pub const fn fixed(name: &'static str) -> Dim {
        Dim(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Dim {
        Dim(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Dim {
    fn from(name: &str) -> Self {
        Dim::new(name)
    }
}

impl Serialize for Dim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Dim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Dim::new)
    }
}
