//! Sequential model architectures
//!
//! An [`Architecture`] is an input shape plus an ordered list of layers.
//! Shape inference walks the layers once and is the single place where a
//! model's structure is checked; the loader and the converter both rely on it.
//!
//! Shapes are per sample and channels-last: `[steps, channels]` for
//! sequence data, `[features]` for flat data.

mod layer;

pub use layer::{Activation, LayerSpec, Padding};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const KERNEL: &str = "kernel";
pub const BIAS: &str = "bias";
pub const GAMMA: &str = "gamma";
pub const BETA: &str = "beta";
pub const MOVING_MEAN: &str = "moving_mean";
pub const MOVING_VARIANCE: &str = "moving_variance";

/// Full tensor name for a layer parameter, e.g. `conv1d_0/kernel`
pub fn weight_name(layer: &str, suffix: &str) -> String {
    format!("{layer}/{suffix}")
}

/// Number of scalars in a tensor of `shape`, or `None` if that overflows `usize`
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// Name and shape of a parameter tensor a layer expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

/// Sequential model description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    /// Per-sample input shape
    pub input_shape: Vec<usize>,

    /// Layers applied in order
    pub layers: Vec<LayerSpec>,
}

impl Architecture {
    pub fn new(input_shape: Vec<usize>) -> Self {
        Self {
            input_shape,
            layers: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: LayerSpec) -> Self {
        self.layers.push(layer);
        self
    }

    /// Resolved name of the layer at `index`
    pub fn layer_name(&self, index: usize) -> String {
        let layer = &self.layers[index];
        layer
            .explicit_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_{index}", layer.kind()))
    }

    /// Output shape of every layer, in order.
    pub fn output_shapes(&self) -> Result<Vec<Vec<usize>>> {
        check_input_shape(&self.input_shape)?;
        self.check_unique_names()?;

        let mut shapes = Vec::with_capacity(self.layers.len());
        let mut current = self.input_shape.clone();
        for (index, layer) in self.layers.iter().enumerate() {
            current = infer_shape(layer, &current).map_err(|reason| {
                Error::UnsupportedModel(format!(
                    "layer {} ({}): {reason}",
                    index,
                    self.layer_name(index)
                ))
            })?;
            shapes.push(current.clone());
        }
        Ok(shapes)
    }

    /// Shape produced by the final layer
    pub fn output_shape(&self) -> Result<Vec<usize>> {
        Ok(self
            .output_shapes()?
            .pop()
            .unwrap_or_else(|| self.input_shape.clone()))
    }

    /// Every parameter tensor the architecture needs, in layer order
    pub fn expected_weights(&self) -> Result<Vec<WeightSpec>> {
        let shapes = self.output_shapes()?;
        let mut weights = Vec::new();

        for (index, layer) in self.layers.iter().enumerate() {
            let input = if index == 0 {
                &self.input_shape
            } else {
                &shapes[index - 1]
            };
            let last = *input.last().unwrap_or(&0);
            let name = self.layer_name(index);

            match layer {
                LayerSpec::Conv1D {
                    filters,
                    kernel_size,
                    use_bias,
                    ..
                } => {
                    weights.push(WeightSpec {
                        name: weight_name(&name, KERNEL),
                        shape: vec![*kernel_size, last, *filters],
                    });
                    if *use_bias {
                        weights.push(WeightSpec {
                            name: weight_name(&name, BIAS),
                            shape: vec![*filters],
                        });
                    }
                }
                LayerSpec::Dense {
                    units, use_bias, ..
                } => {
                    weights.push(WeightSpec {
                        name: weight_name(&name, KERNEL),
                        shape: vec![last, *units],
                    });
                    if *use_bias {
                        weights.push(WeightSpec {
                            name: weight_name(&name, BIAS),
                            shape: vec![*units],
                        });
                    }
                }
                LayerSpec::BatchNormalization { .. } => {
                    for suffix in [GAMMA, BETA, MOVING_MEAN, MOVING_VARIANCE] {
                        weights.push(WeightSpec {
                            name: weight_name(&name, suffix),
                            shape: vec![last],
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(weights)
    }

    fn check_unique_names(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for index in 0..self.layers.len() {
            if !self.layers[index].has_weights() {
                continue;
            }
            let name = self.layer_name(index);
            if !seen.insert(name.clone()) {
                return Err(Error::UnsupportedModel(format!(
                    "duplicate layer name: {name}"
                )));
            }
        }
        Ok(())
    }
}

fn check_input_shape(shape: &[usize]) -> Result<()> {
    if shape.is_empty() || shape.len() > 2 {
        return Err(Error::UnsupportedModel(format!(
            "input shape must be [features] or [steps, channels], got {shape:?}"
        )));
    }
    if shape.contains(&0) {
        return Err(Error::UnsupportedModel(format!(
            "input shape has a zero dimension: {shape:?}"
        )));
    }
    if element_count(shape).is_none() {
        return Err(Error::UnsupportedModel(format!(
            "input shape {shape:?} is too large"
        )));
    }
    Ok(())
}

/// Number of output steps for a window of `window` moved by `stride`.
pub(crate) fn window_steps(steps: usize, window: usize, stride: usize, padding: Padding) -> usize {
    match padding {
        Padding::Valid => (steps - window) / stride + 1,
        Padding::Same => steps.div_ceil(stride),
    }
}

fn sequence_dims(input: &[usize]) -> std::result::Result<(usize, usize), String> {
    match input {
        [steps, channels] => Ok((*steps, *channels)),
        _ => Err(format!("expects [steps, channels] input, got {input:?}")),
    }
}

fn infer_shape(layer: &LayerSpec, input: &[usize]) -> std::result::Result<Vec<usize>, String> {
    match layer {
        LayerSpec::Conv1D {
            filters,
            kernel_size,
            strides,
            padding,
            ..
        } => {
            let (steps, _) = sequence_dims(input)?;
            if *filters == 0 || *kernel_size == 0 || *strides == 0 {
                return Err("filters, kernel_size and strides must be > 0".to_string());
            }
            if *padding == Padding::Valid && *kernel_size > steps {
                return Err(format!(
                    "kernel_size {kernel_size} exceeds {steps} input steps"
                ));
            }
            Ok(vec![
                window_steps(steps, *kernel_size, *strides, *padding),
                *filters,
            ])
        }
        LayerSpec::Dense { units, .. } => {
            if *units == 0 {
                return Err("units must be > 0".to_string());
            }
            let mut out = input.to_vec();
            if let Some(last) = out.last_mut() {
                *last = *units;
            }
            Ok(out)
        }
        LayerSpec::MaxPooling1D { pool_size, strides }
        | LayerSpec::AveragePooling1D { pool_size, strides } => {
            let (steps, channels) = sequence_dims(input)?;
            let stride = strides.unwrap_or(*pool_size);
            if *pool_size == 0 || stride == 0 {
                return Err("pool_size and strides must be > 0".to_string());
            }
            if *pool_size > steps {
                return Err(format!("pool_size {pool_size} exceeds {steps} input steps"));
            }
            Ok(vec![
                window_steps(steps, *pool_size, stride, Padding::Valid),
                channels,
            ])
        }
        LayerSpec::GlobalAveragePooling1D | LayerSpec::GlobalMaxPooling1D => {
            let (_, channels) = sequence_dims(input)?;
            Ok(vec![channels])
        }
        LayerSpec::Flatten => {
            sequence_dims(input)?;
            element_count(input)
                .map(|count| vec![count])
                .ok_or_else(|| format!("flattening {input:?} overflows"))
        }
        LayerSpec::Dropout { rate } => {
            if !(0.0..1.0).contains(rate) {
                return Err(format!("dropout rate {rate} outside [0, 1)"));
            }
            Ok(input.to_vec())
        }
        LayerSpec::BatchNormalization { epsilon, .. } => {
            if *epsilon <= 0.0 {
                return Err(format!("epsilon must be > 0, got {epsilon}"));
            }
            Ok(input.to_vec())
        }
        LayerSpec::ActivationLayer { .. } => Ok(input.to_vec()),
    }
}
