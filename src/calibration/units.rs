// Volume units and normalization
//
// Operators enter the reference volume in milliliters or liters. Everything
// downstream of input (derivation, storage) works in milliliters; conversion
// back to the entered unit happens only for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Milliliters per liter
pub const ML_PER_LITER: f64 = 1000.0;

/// Unit the constant is reported in
pub const CONSTANT_UNIT: &str = "ml/count";

/// Supported volume units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VolumeUnit {
    #[default]
    #[serde(rename = "ml")]
    Milliliters,
    #[serde(rename = "L")]
    Liters,
}

impl VolumeUnit {
    /// Milliliters per one of this unit
    pub fn factor(&self) -> f64 {
        match self {
            VolumeUnit::Milliliters => 1.0,
            VolumeUnit::Liters => ML_PER_LITER,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            VolumeUnit::Milliliters => "ml",
            VolumeUnit::Liters => "L",
        }
    }
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for VolumeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ml" | "milliliter" | "milliliters" => Ok(VolumeUnit::Milliliters),
            "l" | "liter" | "liters" => Ok(VolumeUnit::Liters),
            other => Err(format!("unsupported volume unit '{}' (expected ml or L)", other)),
        }
    }
}

/// A volume as entered by the operator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub value: f64,
    pub unit: VolumeUnit,
}

impl Volume {
    pub fn new(value: f64, unit: VolumeUnit) -> Self {
        Self { value, unit }
    }

    pub fn milliliters(value: f64) -> Self {
        Self::new(value, VolumeUnit::Milliliters)
    }

    pub fn liters(value: f64) -> Self {
        Self::new(value, VolumeUnit::Liters)
    }

    /// Express a canonical milliliter amount in `unit`
    pub fn from_milliliters(ml: f64, unit: VolumeUnit) -> Self {
        Self::new(ml / unit.factor(), unit)
    }

    /// Canonical milliliter amount
    pub fn to_milliliters(&self) -> f64 {
        self.value * self.unit.factor()
    }

    /// Finite and strictly positive once converted to milliliters
    pub fn is_valid(&self) -> bool {
        let ml = self.to_milliliters();
        ml.is_finite() && ml > 0.0
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}
