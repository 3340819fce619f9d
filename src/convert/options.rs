//! Conversion options

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Graph optimization requested from the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    /// Translate layers one to one
    None,
    /// Fold and fuse layers for size and latency
    #[default]
    Default,
}

/// Numeric type used to store constant tensors in the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Float32,
    #[default]
    Float16,
}

impl NumericType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumericType::Float32 => "float32",
            NumericType::Float16 => "float16",
        }
    }

    /// Bytes per stored element
    pub fn size(&self) -> usize {
        match self {
            NumericType::Float32 => 4,
            NumericType::Float16 => 2,
        }
    }

    /// Round a value to what this type can store
    pub fn round(&self, value: f32) -> f32 {
        match self {
            NumericType::Float32 => value,
            NumericType::Float16 => half::f16::from_f32(value).to_f32(),
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumericType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float32" | "f32" | "fp32" => Ok(NumericType::Float32),
            "float16" | "f16" | "fp16" | "half" => Ok(NumericType::Float16),
            _ => Err(format!(
                "Unknown precision: {s}. Valid precisions: float32, float16"
            )),
        }
    }
}

/// Validated conversion options.
///
/// Fields are private so an instance can only come from [`ConversionOptions::new`],
/// which rejects combinations the converter cannot honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    optimization: OptimizationMode,
    target_type: NumericType,
}

impl ConversionOptions {
    /// Reduced precision is part of the optimization request, so
    /// `Float16` without [`OptimizationMode::Default`] is refused.
    pub fn new(optimization: OptimizationMode, target_type: NumericType) -> Result<Self> {
        if target_type != NumericType::Float32 && optimization == OptimizationMode::None {
            return Err(Error::ConversionFailure(format!(
                "unsupported option combination: {target_type} storage requires the default optimization"
            )));
        }
        Ok(Self {
            optimization,
            target_type,
        })
    }

    /// Plain float32 translation with no graph rewrites
    pub fn reference() -> Self {
        Self {
            optimization: OptimizationMode::None,
            target_type: NumericType::Float32,
        }
    }

    pub fn optimization(&self) -> OptimizationMode {
        self.optimization
    }

    pub fn target_type(&self) -> NumericType {
        self.target_type
    }

    pub fn optimize(&self) -> bool {
        self.optimization == OptimizationMode::Default
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            optimization: OptimizationMode::Default,
            target_type: NumericType::Float16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_match_mobile_target() {
        let options = ConversionOptions::default();
        assert!(options.optimize());
        assert_eq!(options.target_type(), NumericType::Float16);
    }

    #[test]
    fn test_float16_without_optimization_rejected() {
        let err = ConversionOptions::new(OptimizationMode::None, NumericType::Float16).unwrap_err();
        assert!(matches!(err, Error::ConversionFailure(_)));
        assert!(err.to_string().contains("unsupported option combination"));
    }

    #[test]
    fn test_valid_combinations() {
        assert!(ConversionOptions::new(OptimizationMode::None, NumericType::Float32).is_ok());
        assert!(ConversionOptions::new(OptimizationMode::Default, NumericType::Float32).is_ok());
        assert!(ConversionOptions::new(OptimizationMode::Default, NumericType::Float16).is_ok());
        assert_eq!(
            ConversionOptions::new(OptimizationMode::None, NumericType::Float32).unwrap(),
            ConversionOptions::reference()
        );
    }

    #[test]
    fn test_numeric_type_from_str() {
        assert_eq!("float16".parse::<NumericType>().unwrap(), NumericType::Float16);
        assert_eq!("FP32".parse::<NumericType>().unwrap(), NumericType::Float32);
        assert!("int8".parse::<NumericType>().is_err());
    }

    #[test]
    fn test_float16_rounding() {
        assert_eq!(NumericType::Float16.round(1.0), 1.0);
        assert_eq!(NumericType::Float32.round(0.1), 0.1);
        let rounded = NumericType::Float16.round(0.1);
        assert!((rounded - 0.1).abs() < 1e-4);
        assert_ne!(rounded, 0.1);
        assert!(NumericType::Float16.round(1e6).is_infinite());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&NumericType::Float16).unwrap(),
            "\"float16\""
        );
        assert_eq!(
            serde_json::to_string(&OptimizationMode::Default).unwrap(),
            "\"default\""
        );
    }
}
