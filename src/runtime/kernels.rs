//! Reference kernels for the lite ops
//!
//! Activations are channels-last: `[steps, channels]` or `[features]`.

use crate::graph::{window_steps, Activation, Padding};
use ndarray::{s, Array1, Array2, ArrayD, ArrayView1, ArrayView2, ArrayView3, Axis};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PoolKind {
    Max,
    Average,
}

/// 1-D convolution with TF-style `same` padding (extra pad on the right)
pub(crate) fn conv1d(
    x: ArrayView2<'_, f32>,
    kernel: ArrayView3<'_, f32>,
    bias: Option<ArrayView1<'_, f32>>,
    stride: usize,
    padding: Padding,
) -> Array2<f32> {
    let steps = x.nrows();
    let (k, _, filters) = kernel.dim();
    let out_steps = window_steps(steps, k, stride, padding);
    let pad_left = match padding {
        Padding::Valid => 0,
        Padding::Same => ((out_steps - 1) * stride + k).saturating_sub(steps) / 2,
    };

    let mut out = Array2::<f32>::zeros((out_steps, filters));
    for (t, mut row) in out.outer_iter_mut().enumerate() {
        let start = (t * stride) as isize - pad_left as isize;
        for j in 0..k {
            let pos = start + j as isize;
            if pos < 0 || pos >= steps as isize {
                continue;
            }
            let taps = kernel.index_axis(Axis(0), j);
            row += &x.row(pos as usize).dot(&taps);
        }
        if let Some(b) = &bias {
            row += b;
        }
    }
    out
}

/// Fully connected layer over the last axis
pub(crate) fn dense(
    x: &ArrayD<f32>,
    kernel: ArrayView2<'_, f32>,
    bias: Option<ArrayView1<'_, f32>>,
) -> Option<ArrayD<f32>> {
    let mut out = match x.ndim() {
        1 => {
            let v = x.view().into_dimensionality::<ndarray::Ix1>().ok()?;
            v.dot(&kernel).into_dyn()
        }
        2 => {
            let m = x.view().into_dimensionality::<ndarray::Ix2>().ok()?;
            m.dot(&kernel).into_dyn()
        }
        _ => return None,
    };
    if let Some(b) = bias {
        out += &b;
    }
    Some(out)
}

/// Inference-mode batch normalization over the last axis
pub(crate) fn batch_norm(
    x: &mut ArrayD<f32>,
    gamma: ArrayView1<'_, f32>,
    beta: ArrayView1<'_, f32>,
    mean: ArrayView1<'_, f32>,
    variance: ArrayView1<'_, f32>,
    epsilon: f32,
) {
    let last = Axis(x.ndim() - 1);
    for mut lane in x.lanes_mut(last) {
        for (c, v) in lane.iter_mut().enumerate() {
            *v = (*v - mean[c]) / (variance[c] + epsilon).sqrt() * gamma[c] + beta[c];
        }
    }
}

/// Windowed pooling along the step axis (valid padding)
pub(crate) fn pool1d(
    x: ArrayView2<'_, f32>,
    pool_size: usize,
    stride: usize,
    kind: PoolKind,
) -> Array2<f32> {
    let (steps, channels) = x.dim();
    let out_steps = window_steps(steps, pool_size, stride, Padding::Valid);
    Array2::from_shape_fn((out_steps, channels), |(t, c)| {
        let window = x.slice(s![t * stride..t * stride + pool_size, c]);
        match kind {
            PoolKind::Max => window.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v)),
            PoolKind::Average => window.sum() / pool_size as f32,
        }
    })
}

/// Reduce the step axis
pub(crate) fn global_pool1d(x: ArrayView2<'_, f32>, kind: PoolKind) -> Array1<f32> {
    match kind {
        PoolKind::Max => x.fold_axis(Axis(0), f32::NEG_INFINITY, |acc, &v| acc.max(v)),
        PoolKind::Average => x.sum_axis(Axis(0)) / x.nrows() as f32,
    }
}

/// Apply an activation in place; softmax normalizes each last-axis lane
pub(crate) fn activate(x: &mut ArrayD<f32>, activation: Activation) {
    match activation {
        Activation::Linear => {}
        Activation::Relu => x.mapv_inplace(|v| v.max(0.0)),
        Activation::Relu6 => x.mapv_inplace(|v| v.clamp(0.0, 6.0)),
        Activation::Sigmoid => x.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
        Activation::Tanh => x.mapv_inplace(f32::tanh),
        Activation::Softmax => {
            let last = Axis(x.ndim() - 1);
            for mut lane in x.lanes_mut(last) {
                let max = lane.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
                lane.mapv_inplace(|v| (v - max).exp());
                let sum = lane.sum();
                lane.mapv_inplace(|v| v / sum);
            }
        }
    }
}
