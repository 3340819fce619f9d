//! Graph rewrites applied under the default optimization
//!
//! Folding only happens into a Conv1D or FullyConnected op whose own
//! activation is linear; otherwise the folded op would run after the
//! nonlinearity it originally followed.

use super::lower::Node;
use crate::graph::{weight_name, Activation, BIAS};
use crate::lite::{LiteTensor, Op};
use crate::{Error, Result};

/// Fold batch norms, fuse activations and drop identity activations
pub(crate) fn optimize(nodes: Vec<Node>) -> Result<Vec<Node>> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());

    for node in nodes {
        if let Some(prev) = out.last_mut() {
            if absorbs(prev) {
                match &node.op {
                    Op::BatchNorm { .. } => {
                        tracing::debug!(into = %prev.layer, layer = %node.layer, "folding batch norm");
                        fold_batch_norm(prev, &node)?;
                        continue;
                    }
                    Op::Activation { activation } => {
                        tracing::debug!(into = %prev.layer, layer = %node.layer, "fusing activation");
                        set_activation(prev, *activation);
                        continue;
                    }
                    _ => {}
                }
            }
        }

        if matches!(node.op, Op::Activation { activation } if activation.is_linear()) {
            continue;
        }
        out.push(node);
    }

    Ok(out)
}

fn absorbs(node: &Node) -> bool {
    match &node.op {
        Op::Conv1D { activation, .. } | Op::FullyConnected { activation, .. } => {
            activation.is_linear()
        }
        _ => false,
    }
}

fn set_activation(node: &mut Node, value: Activation) {
    if let Op::Conv1D { activation, .. } | Op::FullyConnected { activation, .. } = &mut node.op {
        *activation = value;
    }
}

/// Rewrite `bn(x * W + b)` as `x * W' + b'` with
/// `W' = W * s`, `b' = (b - mean) * s + beta`, `s = gamma / sqrt(var + eps)`.
///
/// Kernels keep output channels on the last axis for both Conv1D
/// (`[k, in, out]`) and FullyConnected (`[in, out]`).
fn fold_batch_norm(prev: &mut Node, bn: &Node) -> Result<()> {
    let Op::BatchNorm {
        gamma,
        beta,
        mean,
        variance,
        epsilon,
    } = &bn.op
    else {
        return Err(Error::ConversionFailure(format!(
            "{} is not a batch norm",
            bn.layer
        )));
    };

    let gamma = &bn.tensor(gamma)?.data;
    let beta = &bn.tensor(beta)?.data;
    let mean = &bn.tensor(mean)?.data;
    let variance = &bn.tensor(variance)?.data;

    let scale: Vec<f32> = gamma
        .iter()
        .zip(variance)
        .map(|(g, v)| g / (v + epsilon).sqrt())
        .collect();
    let channels = scale.len();

    let layer = prev.layer.clone();
    let (kernel_name, bias_name) = match &mut prev.op {
        Op::Conv1D { kernel, bias, .. } | Op::FullyConnected { kernel, bias, .. } => {
            let bias_name = bias.get_or_insert_with(|| weight_name(&layer, BIAS)).clone();
            (kernel.clone(), bias_name)
        }
        _ => {
            return Err(Error::ConversionFailure(format!(
                "cannot fold {} into {layer}",
                bn.layer
            )))
        }
    };

    let kernel = prev.tensor_mut(&kernel_name).ok_or_else(|| {
        Error::ConversionFailure(format!("{layer} has no tensor {kernel_name}"))
    })?;
    if kernel.shape.last() != Some(&channels) {
        return Err(Error::ConversionFailure(format!(
            "batch norm {} has {channels} channels, kernel {kernel_name} has shape {:?}",
            bn.layer, kernel.shape
        )));
    }
    for (i, w) in kernel.data.iter_mut().enumerate() {
        *w *= scale[i % channels];
    }

    let folded = |b: f32, c: usize| (b - mean[c]) * scale[c] + beta[c];
    match prev.tensor_mut(&bias_name) {
        Some(bias) => {
            for (c, b) in bias.data.iter_mut().enumerate() {
                *b = folded(*b, c);
            }
        }
        None => {
            let data = (0..channels).map(|c| folded(0.0, c)).collect();
            prev.tensors.push((
                bias_name,
                LiteTensor {
                    shape: vec![channels],
                    data,
                },
            ));
        }
    }

    Ok(())
}
