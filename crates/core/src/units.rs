//! Physical units as exponent vectors over a small base set plus an SI scale.
//!
//! Values stored alongside a [`Unit`] are never rescaled implicitly; the scale records
//! what one stored value is worth in SI so that products of mixed units (µs × Å/µs)
//! resolve to the expected named unit.

use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const SCALE_TOLERANCE: f64 = 1e-9;

/// A physical unit: integer exponents of length, time, mass, angle and counts, and a scale to SI.
#[derive(Debug, Clone, Copy)]
pub struct Unit {
    length: i8,
    time: i8,
    mass: i8,
    angle: i8,
    counts: i8,
    scale: f64,
}

/// Errors raised by unit arithmetic and parsing.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UnitError {
    #[error("cannot take the square root of unit `{0}`")]
    OddSqrt(Unit),
    #[error("unknown unit `{0}`")]
    Parse(String),
}

pub const ONE: Unit = Unit::new(0, 0, 0, 0, 0, 1.0);
pub const M: Unit = Unit::new(1, 0, 0, 0, 0, 1.0);
pub const ANGSTROM: Unit = Unit::new(1, 0, 0, 0, 0, 1e-10);
pub const INV_ANGSTROM: Unit = Unit::new(-1, 0, 0, 0, 0, 1e10);
pub const S: Unit = Unit::new(0, 1, 0, 0, 0, 1.0);
pub const US: Unit = Unit::new(0, 1, 0, 0, 0, 1e-6);
pub const KG: Unit = Unit::new(0, 0, 1, 0, 0, 1.0);
pub const J: Unit = Unit::new(2, -2, 1, 0, 0, 1.0);
pub const MEV: Unit = Unit::new(2, -2, 1, 0, 0, 1.602_176_634e-22);
pub const RAD: Unit = Unit::new(0, 0, 0, 1, 0, 1.0);
pub const DEG: Unit = Unit::new(0, 0, 0, 1, 0, std::f64::consts::PI / 180.0);
pub const COUNTS: Unit = Unit::new(0, 0, 0, 0, 1, 1.0);

const NAMED: &[(&str, Unit)] = &[
    ("dimensionless", ONE),
    ("m", M),
    ("Å", ANGSTROM),
    ("1/Å", INV_ANGSTROM),
    ("s", S),
    ("µs", US),
    ("kg", KG),
    ("J", J),
    ("meV", MEV),
    ("rad", RAD),
    ("deg", DEG),
    ("counts", COUNTS),
];

impl Unit {
    pub const fn new(length: i8, time: i8, mass: i8, angle: i8, counts: i8, scale: f64) -> Self {
        Self {
            length,
            time,
            mass,
            angle,
            counts,
            scale,
        }
    }

    /// Value of one stored unit expressed in SI.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    fn exponents(&self) -> [i8; 5] {
        [self.length, self.time, self.mass, self.angle, self.counts]
    }

    fn same_dimensions(&self, other: &Unit) -> bool {
        self.exponents() == other.exponents()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents() == [0; 5]
    }

    /// Pure angle (radians, degrees, ...).
    pub fn is_angle(&self) -> bool {
        self.exponents() == [0, 0, 0, 1, 0]
    }

    /// Counts divided by some other dimension, such as `counts/µs`.
    pub fn is_count_density(&self) -> bool {
        self.counts != 0 && (self.length, self.time, self.mass, self.angle) != (0, 0, 0, 0)
    }

    pub fn powi(self, n: i8) -> Unit {
        Unit {
            length: self.length * n,
            time: self.time * n,
            mass: self.mass * n,
            angle: self.angle * n,
            counts: self.counts * n,
            scale: self.scale.powi(i32::from(n)),
        }
    }

    pub fn reciprocal(self) -> Unit {
        self.powi(-1)
    }

    pub fn sqrt(self) -> Result<Unit, UnitError> {
        if self.exponents().iter().any(|e| e % 2 != 0) {
            return Err(UnitError::OddSqrt(self));
        }
        Ok(Unit {
            length: self.length / 2,
            time: self.time / 2,
            mass: self.mass / 2,
            angle: self.angle / 2,
            counts: self.counts / 2,
            scale: self.scale.sqrt(),
        })
    }

    fn name(&self) -> Option<&'static str> {
        NAMED
            .iter()
            .find(|(_, unit)| unit == self)
            .map(|(name, _)| *name)
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        let tolerance = SCALE_TOLERANCE * self.scale.abs().max(other.scale.abs());
        self.same_dimensions(other) && (self.scale - other.scale).abs() <= tolerance
    }
}

impl Default for Unit {
    fn default() -> Self {
        ONE
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        Unit {
            length: self.length + rhs.length,
            time: self.time + rhs.time,
            mass: self.mass + rhs.mass,
            angle: self.angle + rhs.angle,
            counts: self.counts + rhs.counts,
            scale: self.scale * rhs.scale,
        }
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        self * rhs.reciprocal()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        // Try "<named>/<named>" before falling back to raw exponents.
        for (num_name, num) in NAMED {
            for (den_name, den) in NAMED.iter().skip(1) {
                if *num / *den == *self {
                    let num_name = if num.is_dimensionless() { "1" } else { num_name };
                    return write!(f, "{num_name}/{den_name}");
                }
            }
        }
        write!(f, "{:e}", self.scale)?;
        let symbols = ["m", "s", "kg", "rad", "counts"];
        for (symbol, exponent) in symbols.iter().zip(self.exponents()) {
            match exponent {
                0 => {}
                1 => write!(f, " {symbol}")?,
                e => write!(f, " {symbol}^{e}")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some((num, den)) = trimmed.split_once('/') {
            let num = if num.trim() == "1" { ONE } else { num.parse()? };
            return Ok(num / den.parse()?);
        }
        let unit = match trimmed {
            "" | "one" | "dimensionless" => ONE,
            "m" => M,
            "angstrom" | "Å" | "AA" => ANGSTROM,
            "s" => S,
            "us" | "µs" | "μs" | "microsecond" => US,
            "kg" => KG,
            "J" => J,
            "meV" => MEV,
            "rad" => RAD,
            "deg" => DEG,
            "counts" => COUNTS,
            other => return Err(UnitError::Parse(other.to_string())),
        };
        Ok(unit)
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A scalar value carrying a unit; used to assemble conversion constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// The quantity expressed in SI, i.e. `value × unit scale`.
    pub fn si_value(&self) -> f64 {
        self.value * self.unit.scale
    }
}

impl Mul for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: Quantity) -> Quantity {
        Quantity::new(self.value * rhs.value, self.unit * rhs.unit)
    }
}

impl Div for Quantity {
    type Output = Quantity;

    fn div(self, rhs: Quantity) -> Quantity {
        Quantity::new(self.value / rhs.value, self.unit / rhs.unit)
    }
}

impl Mul<f64> for Quantity {
    type Output = Quantity;

    fn mul(self, rhs: f64) -> Quantity {
        Quantity::new(self.value * rhs, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_energy_unit_matches_mev() {
        let per_joule = MEV / J;
        assert!((per_joule.scale() - 1.602_176_634e-22).abs() < 1e-30);
        assert_eq!(per_joule * J, MEV);
        assert_eq!(MEV.to_string(), "meV");
    }

    #[test]
    fn composite_units_display_as_ratio() {
        assert_eq!((ANGSTROM / US).to_string(), "Å/µs");
        assert_eq!(ONE / ANGSTROM, INV_ANGSTROM);
        assert_eq!(INV_ANGSTROM.to_string(), "1/Å");
    }

    #[test]
    fn parse_aliases_and_ratios() {
        assert_eq!("us".parse::<Unit>().unwrap(), US);
        assert_eq!("angstrom".parse::<Unit>().unwrap(), ANGSTROM);
        assert_eq!("1/angstrom".parse::<Unit>().unwrap(), INV_ANGSTROM);
        assert!("counts/us".parse::<Unit>().unwrap().is_count_density());
        assert!(!COUNTS.is_count_density());
        assert!("furlong".parse::<Unit>().is_err());
    }

    #[test]
    fn sqrt_requires_even_exponents() {
        assert_eq!((M * M).sqrt().unwrap(), M);
        assert!(M.sqrt().is_err());
    }
}
