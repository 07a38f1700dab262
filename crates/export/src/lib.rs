//! Export helpers for CSV and JSON artifacts.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use neutron_array::ArrayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Array(#[from] ArrayError),
}

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod coords {
    use std::io::Write;

    use neutron_array::{Dim, Measurement};

    use super::ExportError;

    /// Write a dense float coordinate as `index,value[,variance]` rows in row-major order.
    pub fn write_csv<W: Write>(
        writer: W,
        data: &impl Measurement,
        dim: &Dim,
    ) -> Result<(), ExportError> {
        let coord = data.coords().require(dim)?;
        let values = coord.f64_values()?;
        let mut csv = csv::Writer::from_writer(writer);
        match coord.variances() {
            Some(variances) => {
                csv.write_record(["index", "value", "variance"])?;
                for (i, (value, variance)) in values.iter().zip(variances).enumerate() {
                    csv.write_record([i.to_string(), value.to_string(), variance.to_string()])?;
                }
            }
            None => {
                csv.write_record(["index", "value"])?;
                for (i, value) in values.iter().enumerate() {
                    csv.write_record([i.to_string(), value.to_string()])?;
                }
            }
        }
        csv.flush()?;
        Ok(())
    }
}

pub mod summary {
    use std::fs::{self, File};
    use std::io::BufWriter;
    use std::path::Path;

    use chrono::{DateTime, Utc};
    use neutron_array::{Measurement, Variable};
    use neutron_beamline::ConvertMode;
    use serde::{Deserialize, Serialize};
    use serde_json::to_writer_pretty;

    use super::ExportError;

    /// Range of one float coordinate after conversion.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CoordSummary {
        /// Coordinate name; event coordinates are named `item/coord`.
        pub name: String,
        pub unit: String,
        pub dims: Vec<String>,
        pub len: usize,
        pub min: Option<f64>,
        pub max: Option<f64>,
    }

    impl CoordSummary {
        fn from_variable(name: String, variable: &Variable) -> Option<Self> {
            let values = variable.f64_values().ok()?;
            let finite = values.iter().copied().filter(|v| v.is_finite());
            let (min, max) = finite.fold((None, None), |(min, max): (Option<f64>, Option<f64>), v| {
                (
                    Some(min.map_or(v, |m| m.min(v))),
                    Some(max.map_or(v, |m| m.max(v))),
                )
            });
            Some(Self {
                name,
                unit: variable.unit().to_string(),
                dims: variable.dims().labels().map(|d| d.to_string()).collect(),
                len: values.len(),
                min,
                max,
            })
        }
    }

    /// JSON sidecar describing a completed conversion.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ConversionSummary {
        pub from: String,
        pub to: String,
        pub mode: ConvertMode,
        pub converted_at: DateTime<Utc>,
        pub coords: Vec<CoordSummary>,
    }

    impl ConversionSummary {
        /// Summarize the float coordinates of `data`, dense ones first, then event columns.
        pub fn new(
            data: &impl Measurement,
            from: &str,
            to: &str,
            mode: ConvertMode,
            converted_at: DateTime<Utc>,
        ) -> Self {
            let mut coords: Vec<CoordSummary> = data
                .coords()
                .iter()
                .filter_map(|(dim, coord)| CoordSummary::from_variable(dim.to_string(), coord))
                .collect();
            for (name, item) in data.items() {
                let Ok(bins) = item.data().bins() else { continue };
                coords.extend(bins.buffer().coords().iter().filter_map(|(dim, column)| {
                    CoordSummary::from_variable(format!("{name}/{dim}"), column)
                }));
            }
            Self {
                from: from.to_string(),
                to: to.to_string(),
                mode,
                converted_at,
                coords,
            }
        }

        pub fn coord(&self, name: &str) -> Option<&CoordSummary> {
            self.coords.iter().find(|c| c.name == name)
        }
    }

    /// Write the summary as pretty JSON, creating parent directories as needed.
    pub fn write_json(path: &Path, summary: &ConversionSummary) -> Result<(), ExportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let writer = BufWriter::new(File::create(path)?);
        to_writer_pretty(writer, summary)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use neutron_array::{DataArray, Dim, Variable, units};
    use neutron_beamline::ConvertMode;

    use super::*;

    fn array() -> DataArray {
        let counts = Variable::array(Dim::WAVELENGTH, units::COUNTS, vec![1.0, 2.0]);
        let wavelength = Variable::array(Dim::WAVELENGTH, units::ANGSTROM, vec![1.5, 0.5, 2.5])
            .with_variances(vec![0.1, 0.2, 0.3])
            .unwrap();
        DataArray::new("counts", counts)
            .with_coord(Dim::WAVELENGTH, wavelength)
            .unwrap()
    }

    #[test]
    fn csv_includes_variances_when_present() {
        let mut buffer = Vec::new();
        coords::write_csv(&mut buffer, &array(), &Dim::WAVELENGTH).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("index,value,variance"));
        assert_eq!(lines.next(), Some("0,1.5,0.1"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn missing_coordinate_is_an_error() {
        let err = coords::write_csv(Vec::new(), &array(), &Dim::TOF).unwrap_err();
        assert!(matches!(err, ExportError::Array(_)));
    }

    #[test]
    fn summary_round_trips_through_json() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let summary =
            summary::ConversionSummary::new(&array(), "tof", "wavelength", ConvertMode::NoScatter, at);
        let coord = summary.coord("wavelength").unwrap();
        assert_eq!(coord.min, Some(0.5));
        assert_eq!(coord.max, Some(2.5));
        assert_eq!(coord.unit, "Å");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/summary.json");
        summary::write_json(&path, &summary).unwrap();
        let restored: summary::ConversionSummary =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(restored, summary);
    }
}
