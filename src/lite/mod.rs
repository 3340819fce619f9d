//! Lite inference artifacts
//!
//! A lite model is a flat list of inference ops plus the constant tensors
//! they reference. On disk it is a SafeTensors container: tensors are F32
//! or F16 depending on the target precision, and the header's single
//! `aligerar-lite` metadata entry holds the JSON-encoded [`LiteHeader`].
//! Keeping the header in one entry makes the encoding deterministic.

mod artifact;

pub use artifact::{read_lite_model, write_artifact};

use crate::convert::NumericType;
use crate::graph::{Activation, Padding};
use serde::{Deserialize, Serialize};

/// Metadata key holding the lite header
pub const HEADER_KEY: &str = "aligerar-lite";

/// Current artifact layout version
pub const FORMAT_VERSION: u32 = 1;

/// A single inference operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Op {
    Conv1D {
        kernel: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bias: Option<String>,
        stride: usize,
        padding: Padding,
        activation: Activation,
    },
    FullyConnected {
        kernel: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bias: Option<String>,
        activation: Activation,
    },
    BatchNorm {
        gamma: String,
        beta: String,
        mean: String,
        variance: String,
        epsilon: f32,
    },
    MaxPool1D {
        pool_size: usize,
        stride: usize,
    },
    AvgPool1D {
        pool_size: usize,
        stride: usize,
    },
    GlobalAvgPool1D,
    GlobalMaxPool1D,
    Flatten,
    Activation {
        activation: Activation,
    },
}

impl Op {
    /// Names of the tensors this op reads
    pub fn tensor_refs(&self) -> Vec<&str> {
        match self {
            Op::Conv1D { kernel, bias, .. } | Op::FullyConnected { kernel, bias, .. } => {
                let mut refs = vec![kernel.as_str()];
                refs.extend(bias.as_deref());
                refs
            }
            Op::BatchNorm {
                gamma,
                beta,
                mean,
                variance,
                ..
            } => vec![gamma.as_str(), beta.as_str(), mean.as_str(), variance.as_str()],
            _ => Vec::new(),
        }
    }

    /// Short op name for listings
    pub fn name(&self) -> &'static str {
        match self {
            Op::Conv1D { .. } => "CONV_1D",
            Op::FullyConnected { .. } => "FULLY_CONNECTED",
            Op::BatchNorm { .. } => "BATCH_NORM",
            Op::MaxPool1D { .. } => "MAX_POOL_1D",
            Op::AvgPool1D { .. } => "AVERAGE_POOL_1D",
            Op::GlobalAvgPool1D => "MEAN",
            Op::GlobalMaxPool1D => "REDUCE_MAX",
            Op::Flatten => "RESHAPE",
            Op::Activation { activation } => match activation {
                Activation::Linear => "IDENTITY",
                Activation::Relu => "RELU",
                Activation::Relu6 => "RELU6",
                Activation::Sigmoid => "LOGISTIC",
                Activation::Tanh => "TANH",
                Activation::Softmax => "SOFTMAX",
            },
        }
    }
}

/// A constant tensor held at the model's storage precision
#[derive(Debug, Clone, PartialEq)]
pub struct LiteTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// Header stored in the artifact metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteHeader {
    pub format_version: u32,
    pub name: String,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub precision: NumericType,
    pub optimized: bool,
    pub ops: Vec<Op>,
}

/// Converted, inference-ready model
#[derive(Debug, Clone, PartialEq)]
pub struct LiteModel {
    pub name: String,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub precision: NumericType,
    pub optimized: bool,
    pub ops: Vec<Op>,
    pub tensors: Vec<(String, LiteTensor)>,
}

impl LiteModel {
    pub fn tensor(&self, name: &str) -> Option<&LiteTensor> {
        self.tensors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Total number of stored scalars
    pub fn parameter_count(&self) -> usize {
        self.tensors.iter().map(|(_, t)| t.data.len()).sum()
    }

    /// Bytes the tensor payload occupies at the storage precision
    pub fn weight_bytes(&self) -> usize {
        self.parameter_count() * self.precision.size()
    }

    fn header(&self) -> LiteHeader {
        LiteHeader {
            format_version: FORMAT_VERSION,
            name: self.name.clone(),
            input_shape: self.input_shape.clone(),
            output_shape: self.output_shape.clone(),
            precision: self.precision,
            optimized: self.optimized,
            ops: self.ops.clone(),
        }
    }
}
