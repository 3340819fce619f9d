//! Layer to op translation

use crate::graph::{
    weight_name, LayerSpec, BETA, BIAS, GAMMA, KERNEL, MOVING_MEAN, MOVING_VARIANCE,
};
use crate::io::SavedModel;
use crate::lite::{LiteTensor, Op};
use crate::{Error, Result};

/// One op together with the constant tensors it owns
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Node {
    /// Source layer the op came from
    pub layer: String,
    pub op: Op,
    pub tensors: Vec<(String, LiteTensor)>,
}

impl Node {
    fn new(layer: String, op: Op) -> Self {
        Self {
            layer,
            op,
            tensors: Vec::new(),
        }
    }

    pub fn tensor(&self, name: &str) -> Result<&LiteTensor> {
        self.tensors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
            .ok_or_else(|| Error::ConversionFailure(format!("op has no tensor {name}")))
    }

    pub fn tensor_mut(&mut self, name: &str) -> Option<&mut LiteTensor> {
        self.tensors
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}

/// Translate every layer into its inference op.
///
/// Dropout is the identity at inference time and produces no op.
pub(crate) fn lower(model: &SavedModel) -> Result<Vec<Node>> {
    let arch = &model.architecture;
    let mut nodes = Vec::with_capacity(arch.layers.len());

    for (index, layer) in arch.layers.iter().enumerate() {
        let name = arch.layer_name(index);

        let node = match layer {
            LayerSpec::Conv1D {
                strides,
                padding,
                activation,
                use_bias,
                ..
            } => {
                let op = Op::Conv1D {
                    kernel: weight_name(&name, KERNEL),
                    bias: use_bias.then(|| weight_name(&name, BIAS)),
                    stride: *strides,
                    padding: *padding,
                    activation: *activation,
                };
                with_weights(model, name, op, *use_bias)?
            }
            LayerSpec::Dense {
                activation,
                use_bias,
                ..
            } => {
                let op = Op::FullyConnected {
                    kernel: weight_name(&name, KERNEL),
                    bias: use_bias.then(|| weight_name(&name, BIAS)),
                    activation: *activation,
                };
                with_weights(model, name, op, *use_bias)?
            }
            LayerSpec::BatchNormalization { epsilon, .. } => {
                let op = Op::BatchNorm {
                    gamma: weight_name(&name, GAMMA),
                    beta: weight_name(&name, BETA),
                    mean: weight_name(&name, MOVING_MEAN),
                    variance: weight_name(&name, MOVING_VARIANCE),
                    epsilon: *epsilon,
                };
                let mut node = Node::new(name, op);
                for suffix in [GAMMA, BETA, MOVING_MEAN, MOVING_VARIANCE] {
                    node.tensors.push(copy_weight(model, &node.layer, suffix)?);
                }
                node
            }
            LayerSpec::MaxPooling1D { pool_size, strides } => Node::new(
                name,
                Op::MaxPool1D {
                    pool_size: *pool_size,
                    stride: strides.unwrap_or(*pool_size),
                },
            ),
            LayerSpec::AveragePooling1D { pool_size, strides } => Node::new(
                name,
                Op::AvgPool1D {
                    pool_size: *pool_size,
                    stride: strides.unwrap_or(*pool_size),
                },
            ),
            LayerSpec::GlobalAveragePooling1D => Node::new(name, Op::GlobalAvgPool1D),
            LayerSpec::GlobalMaxPooling1D => Node::new(name, Op::GlobalMaxPool1D),
            LayerSpec::Flatten => Node::new(name, Op::Flatten),
            LayerSpec::ActivationLayer { activation } => Node::new(
                name,
                Op::Activation {
                    activation: *activation,
                },
            ),
            LayerSpec::Dropout { .. } => {
                tracing::debug!(layer = %name, "dropping inference-time identity");
                continue;
            }
        };

        nodes.push(node);
    }

    Ok(nodes)
}

fn with_weights(model: &SavedModel, layer: String, op: Op, use_bias: bool) -> Result<Node> {
    let mut node = Node::new(layer, op);
    node.tensors.push(copy_weight(model, &node.layer, KERNEL)?);
    if use_bias {
        node.tensors.push(copy_weight(model, &node.layer, BIAS)?);
    }
    Ok(node)
}

fn copy_weight(model: &SavedModel, layer: &str, suffix: &str) -> Result<(String, LiteTensor)> {
    let name = weight_name(layer, suffix);
    let weight = model
        .get_weight(&name)
        .ok_or_else(|| Error::UnsupportedModel(format!("missing weight tensor: {name}")))?;
    let tensor = LiteTensor {
        shape: weight.shape.clone(),
        data: weight.data.clone(),
    };
    Ok((name, tensor))
}
