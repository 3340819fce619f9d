//! Layer definitions for sequential architectures

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Elementwise activation applied after a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Relu6,
    Sigmoid,
    Tanh,
    /// Softmax over the last axis
    Softmax,
}

impl Activation {
    pub fn is_linear(&self) -> bool {
        matches!(self, Activation::Linear)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Relu => "relu",
            Activation::Relu6 => "relu6",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" | "none" | "identity" => Ok(Activation::Linear),
            "relu" => Ok(Activation::Relu),
            "relu6" => Ok(Activation::Relu6),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "softmax" => Ok(Activation::Softmax),
            _ => Err(format!(
                "Unknown activation: {s}. Valid activations: linear, relu, relu6, sigmoid, tanh, softmax"
            )),
        }
    }
}

/// Padding mode for convolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    #[default]
    Valid,
    Same,
}

fn default_strides() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_epsilon() -> f32 {
    1e-3
}

/// A single layer of a sequential model.
///
/// Field names follow the Keras layer configuration so exported
/// architectures can be written by hand or by a small export script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerSpec {
    Conv1D {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        filters: usize,
        kernel_size: usize,
        #[serde(default = "default_strides")]
        strides: usize,
        #[serde(default)]
        padding: Padding,
        #[serde(default)]
        activation: Activation,
        #[serde(default = "default_true")]
        use_bias: bool,
    },
    Dense {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        units: usize,
        #[serde(default)]
        activation: Activation,
        #[serde(default = "default_true")]
        use_bias: bool,
    },
    MaxPooling1D {
        pool_size: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strides: Option<usize>,
    },
    AveragePooling1D {
        pool_size: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strides: Option<usize>,
    },
    GlobalAveragePooling1D,
    GlobalMaxPooling1D,
    Flatten,
    Dropout {
        rate: f32,
    },
    BatchNormalization {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default = "default_epsilon")]
        epsilon: f32,
    },
    #[serde(rename = "Activation")]
    ActivationLayer { activation: Activation },
}

impl LayerSpec {
    /// Keras-style kind used for default layer names
    pub fn kind(&self) -> &'static str {
        match self {
            LayerSpec::Conv1D { .. } => "conv1d",
            LayerSpec::Dense { .. } => "dense",
            LayerSpec::MaxPooling1D { .. } => "max_pooling1d",
            LayerSpec::AveragePooling1D { .. } => "average_pooling1d",
            LayerSpec::GlobalAveragePooling1D => "global_average_pooling1d",
            LayerSpec::GlobalMaxPooling1D => "global_max_pooling1d",
            LayerSpec::Flatten => "flatten",
            LayerSpec::Dropout { .. } => "dropout",
            LayerSpec::BatchNormalization { .. } => "batch_normalization",
            LayerSpec::ActivationLayer { .. } => "activation",
        }
    }

    /// Explicit name, if one was given
    pub fn explicit_name(&self) -> Option<&str> {
        match self {
            LayerSpec::Conv1D { name, .. }
            | LayerSpec::Dense { name, .. }
            | LayerSpec::BatchNormalization { name, .. } => name.as_deref(),
            _ => None,
        }
    }

    /// Whether the layer owns weight tensors
    pub fn has_weights(&self) -> bool {
        matches!(
            self,
            LayerSpec::Conv1D { .. } | LayerSpec::Dense { .. } | LayerSpec::BatchNormalization { .. }
        )
    }
}
