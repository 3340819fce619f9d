//! Reference interpreter for lite models
//!
//! The interpreter exists so converted artifacts can be loaded and checked
//! independently of the converter. It widens every stored tensor to f32
//! once, checks each op against the tensors it references, and then runs
//! single samples through the op list.

mod kernels;
mod verify;

pub use verify::{compare, verify, VerifyReport};

use crate::graph::{element_count, window_steps, Padding};
use crate::lite::{LiteModel, Op};
use crate::{Error, Result};
use kernels::PoolKind;
use ndarray::{ArrayD, ArrayView1, ArrayView2, ArrayView3, Ix1, Ix2, Ix3, IxDyn};
use std::collections::HashMap;

/// Executes a [`LiteModel`] one sample at a time
#[derive(Debug, Clone)]
pub struct Interpreter {
    input_shape: Vec<usize>,
    output_shape: Vec<usize>,
    ops: Vec<Op>,
    tensors: HashMap<String, ArrayD<f32>>,
}

impl Interpreter {
    /// Prepare a model for execution.
    ///
    /// Fails with [`Error::UnsupportedModel`] if an op's tensors do not fit
    /// the shape flowing into it or the final shape disagrees with the
    /// model's declared output.
    pub fn new(model: &LiteModel) -> Result<Self> {
        let tensors = model
            .tensors
            .iter()
            .map(|(name, tensor)| {
                ArrayD::from_shape_vec(IxDyn(&tensor.shape), tensor.data.clone())
                    .map(|array| (name.clone(), array))
                    .map_err(|e| Error::UnsupportedModel(format!("tensor {name}: {e}")))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let interpreter = Self {
            input_shape: model.input_shape.clone(),
            output_shape: model.output_shape.clone(),
            ops: model.ops.clone(),
            tensors,
        };

        let inferred = interpreter.check_shapes()?;
        if inferred != model.output_shape {
            return Err(Error::UnsupportedModel(format!(
                "ops produce shape {inferred:?} but the model declares {:?}",
                model.output_shape
            )));
        }

        Ok(interpreter)
    }

    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    pub fn output_shape(&self) -> &[usize] {
        &self.output_shape
    }

    /// Number of scalars one input sample must have
    pub fn input_len(&self) -> usize {
        // checked in `new`
        element_count(&self.input_shape).unwrap_or(0)
    }

    /// Run one sample, given as a flat row-major buffer
    pub fn predict(&self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.input_len() {
            return Err(Error::Runtime(format!(
                "input has {} values, model expects {} (shape {:?})",
                input.len(),
                self.input_len(),
                self.input_shape
            )));
        }

        let mut x = ArrayD::from_shape_vec(IxDyn(&self.input_shape), input.to_vec())
            .map_err(|e| Error::Runtime(e.to_string()))?;

        for op in &self.ops {
            x = self.run_op(op, x)?;
        }

        Ok(x.iter().copied().collect())
    }

    /// Run several samples in sequence
    pub fn predict_batch(&self, inputs: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        inputs.iter().map(|input| self.predict(input)).collect()
    }

    fn run_op(&self, op: &Op, mut x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let out = match op {
            Op::Conv1D {
                kernel,
                bias,
                stride,
                padding,
                activation,
            } => {
                let input = as2(&x)?;
                let mut out = kernels::conv1d(
                    input,
                    self.view3(kernel)?,
                    self.optional1(bias.as_deref())?,
                    *stride,
                    *padding,
                )
                .into_dyn();
                kernels::activate(&mut out, *activation);
                out
            }
            Op::FullyConnected {
                kernel,
                bias,
                activation,
            } => {
                let mut out =
                    kernels::dense(&x, self.view2(kernel)?, self.optional1(bias.as_deref())?)
                        .ok_or_else(|| {
                            Error::Runtime(format!("dense input has rank {}", x.ndim()))
                        })?;
                kernels::activate(&mut out, *activation);
                out
            }
            Op::BatchNorm {
                gamma,
                beta,
                mean,
                variance,
                epsilon,
            } => {
                kernels::batch_norm(
                    &mut x,
                    self.view1(gamma)?,
                    self.view1(beta)?,
                    self.view1(mean)?,
                    self.view1(variance)?,
                    *epsilon,
                );
                x
            }
            Op::MaxPool1D { pool_size, stride } => {
                kernels::pool1d(as2(&x)?, *pool_size, *stride, PoolKind::Max).into_dyn()
            }
            Op::AvgPool1D { pool_size, stride } => {
                kernels::pool1d(as2(&x)?, *pool_size, *stride, PoolKind::Average).into_dyn()
            }
            Op::GlobalAvgPool1D => kernels::global_pool1d(as2(&x)?, PoolKind::Average).into_dyn(),
            Op::GlobalMaxPool1D => kernels::global_pool1d(as2(&x)?, PoolKind::Max).into_dyn(),
            Op::Flatten => {
                let flat: Vec<f32> = x.iter().copied().collect();
                ArrayD::from_shape_vec(IxDyn(&[flat.len()]), flat)
                    .map_err(|e| Error::Runtime(e.to_string()))?
            }
            Op::Activation { activation } => {
                kernels::activate(&mut x, *activation);
                x
            }
        };
        Ok(out)
    }

    /// Walk the ops symbolically and return the final shape
    fn check_shapes(&self) -> Result<Vec<usize>> {
        let mut shape = self.input_shape.clone();
        if shape.is_empty()
            || shape.len() > 2
            || shape.contains(&0)
            || element_count(&shape).is_none()
        {
            return Err(Error::UnsupportedModel(format!(
                "invalid input shape {shape:?}"
            )));
        }

        for (index, op) in self.ops.iter().enumerate() {
            shape = self.op_shape(op, &shape).map_err(|reason| {
                Error::UnsupportedModel(format!("op {index} ({}): {reason}", op.name()))
            })?;
        }
        Ok(shape)
    }

    fn op_shape(&self, op: &Op, input: &[usize]) -> std::result::Result<Vec<usize>, String> {
        let last = *input.last().unwrap_or(&0);
        match op {
            Op::Conv1D {
                kernel,
                bias,
                stride,
                padding,
                ..
            } => {
                let [steps, channels] = input else {
                    return Err(format!("expects [steps, channels], got {input:?}"));
                };
                let kshape = self.shape_of(kernel)?;
                let [k, kin, filters] = kshape[..] else {
                    return Err(format!("kernel {kernel} must be rank 3, got {kshape:?}"));
                };
                if kin != *channels || k == 0 || filters == 0 || *stride == 0 {
                    return Err(format!("kernel {kernel} shape {kshape:?} does not fit input {input:?}"));
                }
                if *padding == Padding::Valid && k > *steps {
                    return Err(format!("kernel length {k} exceeds {steps} steps"));
                }
                self.check_vector(bias.as_deref(), filters)?;
                Ok(vec![window_steps(*steps, k, *stride, *padding), filters])
            }
            Op::FullyConnected { kernel, bias, .. } => {
                let kshape = self.shape_of(kernel)?;
                let [kin, units] = kshape[..] else {
                    return Err(format!("kernel {kernel} must be rank 2, got {kshape:?}"));
                };
                if kin != last || units == 0 {
                    return Err(format!("kernel {kernel} shape {kshape:?} does not fit input {input:?}"));
                }
                self.check_vector(bias.as_deref(), units)?;
                let mut out = input.to_vec();
                if let Some(l) = out.last_mut() {
                    *l = units;
                }
                Ok(out)
            }
            Op::BatchNorm {
                gamma,
                beta,
                mean,
                variance,
                epsilon,
            } => {
                for name in [gamma, beta, mean, variance] {
                    self.check_vector(Some(name.as_str()), last)?;
                }
                if *epsilon < 0.0 {
                    return Err(format!("negative epsilon {epsilon}"));
                }
                Ok(input.to_vec())
            }
            Op::MaxPool1D { pool_size, stride } | Op::AvgPool1D { pool_size, stride } => {
                let [steps, channels] = input else {
                    return Err(format!("expects [steps, channels], got {input:?}"));
                };
                if *pool_size == 0 || *stride == 0 || pool_size > steps {
                    return Err(format!("pool {pool_size}/{stride} does not fit {steps} steps"));
                }
                Ok(vec![
                    window_steps(*steps, *pool_size, *stride, Padding::Valid),
                    *channels,
                ])
            }
            Op::GlobalAvgPool1D | Op::GlobalMaxPool1D => match input {
                [_, channels] => Ok(vec![*channels]),
                _ => Err(format!("expects [steps, channels], got {input:?}")),
            },
            Op::Flatten => {
                let [_, _] = input else {
                    return Err(format!("expects [steps, channels], got {input:?}"));
                };
                element_count(input)
                    .map(|count| vec![count])
                    .ok_or_else(|| format!("flattening {input:?} overflows"))
            }
            Op::Activation { .. } => Ok(input.to_vec()),
        }
    }

    fn shape_of(&self, name: &str) -> std::result::Result<Vec<usize>, String> {
        self.tensors
            .get(name)
            .map(|t| t.shape().to_vec())
            .ok_or_else(|| format!("missing tensor {name}"))
    }

    fn check_vector(&self, name: Option<&str>, len: usize) -> std::result::Result<(), String> {
        if let Some(name) = name {
            let shape = self.shape_of(name)?;
            if shape != [len] {
                return Err(format!("tensor {name} has shape {shape:?}, expected [{len}]"));
            }
        }
        Ok(())
    }

    fn tensor(&self, name: &str) -> Result<&ArrayD<f32>> {
        self.tensors
            .get(name)
            .ok_or_else(|| Error::Runtime(format!("missing tensor {name}")))
    }

    fn view1(&self, name: &str) -> Result<ArrayView1<'_, f32>> {
        self.tensor(name)?
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|e| Error::Runtime(format!("tensor {name}: {e}")))
    }

    fn view2(&self, name: &str) -> Result<ArrayView2<'_, f32>> {
        self.tensor(name)?
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|e| Error::Runtime(format!("tensor {name}: {e}")))
    }

    fn view3(&self, name: &str) -> Result<ArrayView3<'_, f32>> {
        self.tensor(name)?
            .view()
            .into_dimensionality::<Ix3>()
            .map_err(|e| Error::Runtime(format!("tensor {name}: {e}")))
    }

    fn optional1(&self, name: Option<&str>) -> Result<Option<ArrayView1<'_, f32>>> {
        name.map(|n| self.view1(n)).transpose()
    }
}

fn as2(x: &ArrayD<f32>) -> Result<ArrayView2<'_, f32>> {
    x.view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::Runtime(format!("expected [steps, channels], got {:?}", x.shape())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::NumericType;
    use crate::graph::Activation;
    use crate::lite::LiteTensor;
    use approx::assert_abs_diff_eq;

    fn tensor(shape: Vec<usize>, data: Vec<f32>) -> LiteTensor {
        LiteTensor { shape, data }
    }

    fn tiny_cnn() -> LiteModel {
        LiteModel {
            name: "tiny-cnn".into(),
            input_shape: vec![4, 1],
            output_shape: vec![2],
            precision: NumericType::Float32,
            optimized: false,
            ops: vec![
                Op::Conv1D {
                    kernel: "c/kernel".into(),
                    bias: None,
                    stride: 1,
                    padding: Padding::Valid,
                    activation: Activation::Relu,
                },
                Op::GlobalMaxPool1D,
                Op::FullyConnected {
                    kernel: "d/kernel".into(),
                    bias: Some("d/bias".into()),
                    activation: Activation::Linear,
                },
            ],
            tensors: vec![
                ("c/kernel".into(), tensor(vec![2, 1, 1], vec![1.0, -1.0])),
                ("d/kernel".into(), tensor(vec![1, 2], vec![2.0, -3.0])),
                ("d/bias".into(), tensor(vec![2], vec![1.0, 0.0])),
            ],
        }
    }

    #[test]
    fn test_predict_hand_computed() {
        let interp = Interpreter::new(&tiny_cnn()).unwrap();
        // conv: [3-1, 1-5, 5-1] = [2, -4, 4] -> relu [2, 0, 4] -> max 4
        let out = interp.predict(&[3.0, 1.0, 5.0, 1.0]).unwrap();
        assert_abs_diff_eq!(out[0], 9.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], -12.0, epsilon = 1e-6);
    }

    #[test]
    fn test_predict_rejects_wrong_input_length() {
        let interp = Interpreter::new(&tiny_cnn()).unwrap();
        let err = interp.predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
    }

    #[test]
    fn test_predict_batch() {
        let interp = Interpreter::new(&tiny_cnn()).unwrap();
        let outs = interp
            .predict_batch(&[vec![0.0; 4], vec![3.0, 1.0, 5.0, 1.0]])
            .unwrap();
        assert_eq!(outs.len(), 2);
        assert_eq!(outs[0], vec![1.0, 0.0]);
    }

    #[test]
    fn test_mismatched_kernel_rejected() {
        let mut model = tiny_cnn();
        model.tensors[1].1 = tensor(vec![3, 2], vec![0.0; 6]);
        let err = Interpreter::new(&model).unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel(_)));
        assert!(err.to_string().contains("d/kernel"));
    }

    #[test]
    fn test_declared_output_shape_checked() {
        let mut model = tiny_cnn();
        model.output_shape = vec![3];
        assert!(Interpreter::new(&model).is_err());
    }

    #[test]
    fn test_oversized_input_shape_rejected() {
        let model = LiteModel {
            input_shape: vec![1 << 32, 1 << 32],
            output_shape: vec![0],
            ops: vec![Op::Flatten],
            tensors: Vec::new(),
            ..tiny_cnn()
        };
        let bytes = model.to_bytes().unwrap();
        let parsed = LiteModel::from_bytes(&bytes).unwrap();

        let err = Interpreter::new(&parsed).unwrap_err();
        assert!(matches!(err, Error::UnsupportedModel(_)));
    }

    #[test]
    fn test_flatten_of_flat_input_rejected() {
        let model = LiteModel {
            input_shape: vec![4],
            output_shape: vec![4],
            ops: vec![Op::Flatten],
            tensors: Vec::new(),
            ..tiny_cnn()
        };
        let err = Interpreter::new(&model).unwrap_err();
        assert!(err.to_string().contains("expects [steps, channels]"));
    }

    #[test]
    fn test_missing_tensor_rejected() {
        let mut model = tiny_cnn();
        model.tensors.remove(2);
        let err = Interpreter::new(&model).unwrap_err();
        assert!(err.to_string().contains("d/bias"));
    }
}
