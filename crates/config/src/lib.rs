//! Measurement manifests describing coordinates, items and event buffers.
//!
//! A manifest is YAML unless its file name ends in `.toml`:
//!
//! ```yaml
//! conversion: { from: tof, to: dspacing }
//! coords:
//!   tof: { dims: [tof], unit: us, values: [1000.0, 2000.0, 3000.0] }
//!   position: { dims: [spectrum], unit: m, vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] }
//!   source_position: { unit: m, vectors: [[0.0, 0.0, -10.0]] }
//!   sample_position: { unit: m, vectors: [[0.0, 0.0, 0.0]] }
//! items:
//!   counts:
//!     data: { dims: [spectrum, tof], shape: [2, 2], unit: counts, values: [1, 2, 3, 4] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use neutron_array::{
    ArrayError, Bins, DataArray, Dataset, Dim, Dimensions, Unit, Values, Variable,
};
use neutron_beamline::ConvertMode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading measurement manifests.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid manifest: {0}")]
    Invalid(String),
    #[error("invalid manifest entry `{entry}`: {source}")]
    Array {
        entry: String,
        #[source]
        source: ArrayError,
    },
}

fn invalid_entry(entry: impl Into<String>) -> impl FnOnce(ArrayError) -> ConfigError {
    let entry = entry.into();
    move |source| ConfigError::Array { entry, source }
}

/// Element type requested for float data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    Float64,
    Float32,
}

/// A single variable: either float `values` or 3-vector `vectors`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableConfig {
    #[serde(default)]
    pub dims: Vec<String>,
    /// Required for more than one dimension; inferred from the element count otherwise.
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    pub unit: Unit,
    #[serde(default)]
    pub values: Option<Vec<f64>>,
    #[serde(default)]
    pub vectors: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    pub variances: Option<Vec<f64>>,
    #[serde(default)]
    pub dtype: ElementType,
}

impl VariableConfig {
    fn element_count(&self) -> usize {
        match (&self.values, &self.vectors) {
            (Some(values), _) => values.len(),
            (None, Some(vectors)) => vectors.len(),
            (None, None) => 0,
        }
    }

    fn dimensions(&self, name: &str, default_dim: Option<&Dim>) -> Result<Dimensions, ConfigError> {
        let labels: Vec<Dim> = if self.dims.is_empty() {
            default_dim.into_iter().cloned().collect()
        } else {
            self.dims.iter().map(|d| Dim::new(d.as_str())).collect()
        };
        let shape = match (&self.shape, labels.len()) {
            (Some(shape), _) => shape.clone(),
            (None, 0) => Vec::new(),
            (None, 1) => vec![self.element_count()],
            (None, _) => {
                return Err(ConfigError::Invalid(format!(
                    "`{name}` spans several dimensions and needs an explicit shape"
                )));
            }
        };
        Dimensions::new(labels, shape).map_err(invalid_entry(name))
    }

    /// Build the variable; `default_dim` applies when `dims` is omitted.
    pub fn to_variable(&self, name: &str, default_dim: Option<&Dim>) -> Result<Variable, ConfigError> {
        let dims = self.dimensions(name, default_dim)?;
        let values = match (&self.values, &self.vectors, self.dtype) {
            (Some(_), Some(_), _) => {
                return Err(ConfigError::Invalid(format!(
                    "`{name}` sets both `values` and `vectors`"
                )));
            }
            (Some(values), None, ElementType::Float64) => Values::F64(values.clone()),
            (Some(values), None, ElementType::Float32) => {
                Values::F32(values.iter().map(|&v| v as f32).collect())
            }
            (None, Some(vectors), _) => Values::Vector3(vectors.clone()),
            (None, None, _) => {
                return Err(ConfigError::Invalid(format!(
                    "`{name}` needs `values` or `vectors`"
                )));
            }
        };
        let variable = Variable::new(dims, self.unit, values).map_err(invalid_entry(name))?;
        match &self.variances {
            Some(variances) => variable
                .with_variances(variances.clone())
                .map_err(invalid_entry(name)),
            None => Ok(variable),
        }
    }
}

/// Event lists: one range into a flat event buffer per outer element.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventsConfig {
    #[serde(default)]
    pub dims: Vec<String>,
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    pub ranges: Vec<(usize, usize)>,
    /// Per-event coordinates, along `event` unless stated otherwise.
    #[serde(default)]
    pub coords: BTreeMap<String, VariableConfig>,
    pub weights: VariableConfig,
}

impl EventsConfig {
    fn to_variable(&self, name: &str) -> Result<Variable, ConfigError> {
        let labels: Vec<Dim> = self.dims.iter().map(|d| Dim::new(d.as_str())).collect();
        let shape = match (&self.shape, labels.len()) {
            (Some(shape), _) => shape.clone(),
            (None, 1) => vec![self.ranges.len()],
            (None, _) => {
                return Err(ConfigError::Invalid(format!(
                    "events of `{name}` need `dims` and, for several dimensions, a shape"
                )));
            }
        };
        let outer = Dimensions::new(labels, shape).map_err(invalid_entry(name))?;
        let weights = self.weights.to_variable(name, Some(&Dim::EVENT))?;
        let mut buffer = DataArray::new(name, weights);
        for (coord_name, coord) in &self.coords {
            let variable = coord.to_variable(coord_name, Some(&Dim::EVENT))?;
            buffer
                .set_coord(Dim::new(coord_name.as_str()), variable)
                .map_err(invalid_entry(coord_name.as_str()))?;
        }
        let bins = Bins::new(self.ranges.clone(), Dim::EVENT, buffer).map_err(invalid_entry(name))?;
        Variable::binned(outer, bins).map_err(invalid_entry(name))
    }
}

/// One named item: dense `data` or binned `events`, plus item-local attributes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemConfig {
    #[serde(default)]
    pub data: Option<VariableConfig>,
    #[serde(default)]
    pub events: Option<EventsConfig>,
    #[serde(default)]
    pub attrs: BTreeMap<String, VariableConfig>,
}

/// Default conversion carried by a manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    pub from: String,
    pub to: String,
    /// Scattering mode; inferred from `sample_position` when absent.
    #[serde(default)]
    pub mode: Option<ConvertMode>,
}

impl ConversionConfig {
    pub fn dims(&self) -> (Dim, Dim) {
        (Dim::new(self.from.as_str()), Dim::new(self.to.as_str()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasurementConfig {
    #[serde(default)]
    pub conversion: Option<ConversionConfig>,
    #[serde(default)]
    pub coords: BTreeMap<String, VariableConfig>,
    pub items: BTreeMap<String, ItemConfig>,
}

impl MeasurementConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Assemble the dataset: items first, then shared coordinates, then attributes.
    pub fn to_dataset(&self) -> Result<Dataset, ConfigError> {
        let mut dataset = Dataset::new();
        for (name, item) in &self.items {
            let data = match (&item.data, &item.events) {
                (Some(data), None) => data.to_variable(name, None)?,
                (None, Some(events)) => events.to_variable(name)?,
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "item `{name}` needs exactly one of `data` and `events`"
                    )));
                }
            };
            dataset.set_item(name.as_str(), data).map_err(invalid_entry(name.as_str()))?;
        }
        for (name, coord) in &self.coords {
            let variable = coord.to_variable(name, None)?;
            dataset
                .set_coord(Dim::new(name.as_str()), variable)
                .map_err(invalid_entry(name.as_str()))?;
        }
        for (item_name, item) in &self.items {
            for (name, attr) in &item.attrs {
                let variable = attr.to_variable(name, None)?;
                dataset
                    .set_attr(item_name, Dim::new(name.as_str()), variable)
                    .map_err(invalid_entry(format!("{item_name}.{name}")))?;
            }
        }
        tracing::debug!(
            items = dataset.len(),
            coords = self.coords.len(),
            "assembled measurement"
        );
        Ok(dataset)
    }
}

/// Read a manifest, choosing TOML or YAML from the file extension.
pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<MeasurementConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    if path.extension().map(|ext| ext == "toml").unwrap_or(false) {
        MeasurementConfig::from_toml_str(&contents)
    } else {
        MeasurementConfig::from_yaml_str(&contents)
    }
}

/// Load a manifest and assemble its dataset.
pub fn load_measurement<P: AsRef<Path>>(path: P) -> Result<Dataset, ConfigError> {
    load_manifest(path)?.to_dataset()
}
