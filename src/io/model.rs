//! Source model structure for serialization

use crate::graph::{element_count, Architecture, BETA, BIAS, GAMMA, MOVING_MEAN, MOVING_VARIANCE};
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Model metadata describing where the model came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name/identifier
    pub name: String,

    /// Architecture family label (e.g., "cnn1d", "mlp")
    pub architecture: String,

    /// Model version
    pub version: String,

    /// Custom metadata fields
    #[serde(default)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl ModelMetadata {
    /// Create new metadata with minimal fields
    pub fn new(name: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            architecture: architecture.into(),
            version: "0.1.0".to_string(),
            custom: HashMap::new(),
        }
    }

    /// Add custom metadata field
    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }
}

/// A dense f32 parameter tensor
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl WeightTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected = element_count(&shape).ok_or_else(|| {
            Error::UnsupportedModel(format!("tensor shape {shape:?} is too large"))
        })?;
        if expected != data.len() {
            return Err(Error::UnsupportedModel(format!(
                "tensor shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Information about a model parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name (e.g., "conv1d_0/kernel")
    pub name: String,

    /// Parameter shape
    pub shape: Vec<usize>,

    /// Data type of the stored values
    #[serde(default = "default_dtype")]
    pub dtype: String,
}

fn default_dtype() -> String {
    "f32".to_string()
}

/// Serializable model state used by the text formats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelState {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Layer graph
    pub architecture: Architecture,

    /// Parameter information
    pub parameters: Vec<ParameterInfo>,

    /// Flattened parameter data
    pub data: Vec<f32>,
}

/// A trained model: metadata, architecture and named weights
#[derive(Debug, Clone, PartialEq)]
pub struct SavedModel {
    /// Model metadata
    pub metadata: ModelMetadata,

    /// Layer graph
    pub architecture: Architecture,

    /// Named parameters
    pub weights: Vec<(String, WeightTensor)>,
}

impl SavedModel {
    /// Create a new model
    pub fn new(
        metadata: ModelMetadata,
        architecture: Architecture,
        weights: Vec<(String, WeightTensor)>,
    ) -> Self {
        Self {
            metadata,
            architecture,
            weights,
        }
    }

    /// Build a model with freshly initialized weights.
    ///
    /// Kernels are Glorot-uniform, biases and batch-norm statistics are small
    /// deterministic perturbations so every weight path is exercised.
    pub fn initialize(
        metadata: ModelMetadata,
        architecture: Architecture,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let specs = architecture.expected_weights()?;

        let weights = specs
            .into_iter()
            .map(|spec| {
                let count = element_count(&spec.shape).ok_or_else(|| {
                    Error::UnsupportedModel(format!("weight {} is too large", spec.name))
                })?;
                let suffix = spec.name.rsplit('/').next().unwrap_or_default();
                let data: Vec<f32> = match suffix {
                    GAMMA => sample(&mut rng, count, 0.8, 1.2),
                    BETA | MOVING_MEAN => sample(&mut rng, count, -0.1, 0.1),
                    MOVING_VARIANCE => sample(&mut rng, count, 0.5, 1.5),
                    BIAS => sample(&mut rng, count, -0.05, 0.05),
                    _ => {
                        let (fan_in, fan_out) = fans(&spec.shape);
                        let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                        sample(&mut rng, count, -limit, limit)
                    }
                };
                let tensor = WeightTensor::new(spec.shape, data)?;
                Ok((spec.name, tensor))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(metadata, architecture, weights))
    }

    /// Get weight by name
    pub fn get_weight(&self, name: &str) -> Option<&WeightTensor> {
        self.weights
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    /// Total number of scalar parameters
    pub fn parameter_count(&self) -> usize {
        self.weights.iter().map(|(_, t)| t.len()).sum()
    }

    /// Check the weights against the architecture.
    ///
    /// Every expected parameter must be present with the inferred shape.
    /// Extra tensors are ignored by the converter and only reported.
    pub fn validate(&self) -> Result<()> {
        let expected = self.architecture.expected_weights()?;

        for spec in &expected {
            let tensor = self.get_weight(&spec.name).ok_or_else(|| {
                Error::UnsupportedModel(format!("missing weight tensor: {}", spec.name))
            })?;
            if tensor.shape != spec.shape {
                return Err(Error::UnsupportedModel(format!(
                    "weight {} has shape {:?}, architecture expects {:?}",
                    spec.name, tensor.shape, spec.shape
                )));
            }
        }

        for (name, _) in &self.weights {
            if !expected.iter().any(|spec| &spec.name == name) {
                tracing::warn!(tensor = %name, "ignoring tensor not referenced by any layer");
            }
        }

        Ok(())
    }

    /// Convert model to serializable state
    pub fn to_state(&self) -> ModelState {
        let mut data = Vec::with_capacity(self.parameter_count());
        let parameters = self
            .weights
            .iter()
            .map(|(name, tensor)| {
                data.extend_from_slice(&tensor.data);
                ParameterInfo {
                    name: name.clone(),
                    shape: tensor.shape.clone(),
                    dtype: default_dtype(),
                }
            })
            .collect();

        ModelState {
            metadata: self.metadata.clone(),
            architecture: self.architecture.clone(),
            parameters,
            data,
        }
    }

    /// Create model from serializable state
    pub fn from_state(state: ModelState) -> Result<Self> {
        let mut offset: usize = 0;
        let mut weights = Vec::with_capacity(state.parameters.len());

        for info in state.parameters {
            let end = element_count(&info.shape)
                .and_then(|size| offset.checked_add(size))
                .filter(|&end| end <= state.data.len());
            let Some(end) = end else {
                return Err(Error::UnsupportedModel(format!(
                    "parameter {} runs past the end of the data block",
                    info.name
                )));
            };
            let tensor = WeightTensor::new(info.shape, state.data[offset..end].to_vec())?;
            weights.push((info.name, tensor));
            offset = end;
        }

        if offset != state.data.len() {
            return Err(Error::UnsupportedModel(format!(
                "data block has {} trailing values",
                state.data.len() - offset
            )));
        }

        Ok(Self::new(state.metadata, state.architecture, weights))
    }
}

fn fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [k, input, output] => (k * input, k * output),
        [input, output] => (*input, *output),
        [n] => (*n, *n),
        _ => (1, 1),
    }
}

fn sample(rng: &mut StdRng, count: usize, low: f32, high: f32) -> Vec<f32> {
    (0..count).map(|_| rng.random_range(low..high)).collect()
}
