//! YAML schema for declarative conversion configuration

use crate::convert::{ConversionOptions, NumericType, OptimizationMode};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source model converted when no input is given
pub const DEFAULT_INPUT: &str = "model/cnn1d_model.safetensors";

/// Artifact written when no output is given
pub const DEFAULT_OUTPUT: &str = "cnn1d_model.lite";

/// Complete conversion specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertSpec {
    /// Source model path (json, yaml or safetensors)
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Lite artifact path
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Graph optimization: "default" | "none"
    #[serde(default)]
    pub optimization: OptimizationMode,

    /// Stored tensor type: "float16" | "float32"
    #[serde(default)]
    pub precision: NumericType,

    /// Replace an existing artifact
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

impl ConvertSpec {
    /// Validated conversion options for this spec
    pub fn options(&self) -> Result<ConversionOptions> {
        ConversionOptions::new(self.optimization, self.precision)
    }
}

impl Default for ConvertSpec {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            optimization: OptimizationMode::default(),
            precision: NumericType::default(),
            overwrite: true,
        }
    }
}

fn default_input() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT)
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let spec: ConvertSpec = serde_yaml::from_str("{}").unwrap();
        assert_eq!(spec, ConvertSpec::default());
        assert_eq!(spec.input, PathBuf::from("model/cnn1d_model.safetensors"));
        assert_eq!(spec.output, PathBuf::from("cnn1d_model.lite"));
        assert!(spec.overwrite);
    }

    #[test]
    fn test_deserialize_full_config() {
        let yaml = r#"
input: models/ecg.json
output: out/ecg.lite
optimization: none
precision: float32
overwrite: false
"#;

        let spec: ConvertSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.input, PathBuf::from("models/ecg.json"));
        assert_eq!(spec.optimization, OptimizationMode::None);
        assert_eq!(spec.precision, NumericType::Float32);
        assert!(!spec.overwrite);
        assert_eq!(spec.options().unwrap(), ConversionOptions::reference());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_yaml::from_str::<ConvertSpec>("quantize: int8\n").is_err());
    }

    #[test]
    fn test_invalid_option_combination_surfaces_as_conversion_failure() {
        let spec = ConvertSpec {
            optimization: OptimizationMode::None,
            ..ConvertSpec::default()
        };
        assert!(matches!(spec.options(), Err(Error::ConversionFailure(_))));
    }
}
