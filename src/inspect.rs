//! Model inspection for source models and lite artifacts

use crate::convert::NumericType;
use crate::graph::LayerSpec;
use crate::io::{load_model, SavedModel};
use crate::lite::{read_lite_model, LiteModel, Op};
use crate::output::{format_bytes, format_number, Table, TableBuilder};
use crate::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Extension of lite artifacts
pub const LITE_EXTENSION: &str = "lite";

/// Information about a single tensor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorInfo {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: &'static str,
    pub size_bytes: usize,
}

/// One layer of a source model or one op of a lite model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepInfo {
    pub name: String,
    pub kind: String,
    pub detail: String,
}

/// Summary of a model file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub path: PathBuf,
    /// "source" or "lite"
    pub kind: &'static str,
    pub name: String,
    pub size_bytes: u64,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
    pub precision: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimized: Option<bool>,
    pub parameters: usize,
    pub steps: Vec<StepInfo>,
    pub tensors: Vec<TensorInfo>,
}

/// Inspect a model file; `.lite` files are read as artifacts
pub fn inspect_model(path: impl AsRef<Path>) -> Result<ModelInfo> {
    let path = path.as_ref();
    let is_lite = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(LITE_EXTENSION));

    let mut info = if is_lite {
        lite_info(&read_lite_model(path)?)
    } else {
        source_info(&load_model(path)?)?
    };
    info.path = path.to_path_buf();
    info.size_bytes = std::fs::metadata(path).map_or(0, |m| m.len());
    Ok(info)
}

/// Describe an in-memory source model
pub fn source_info(model: &SavedModel) -> Result<ModelInfo> {
    let arch = &model.architecture;
    let shapes = arch.output_shapes()?;

    let steps = arch
        .layers
        .iter()
        .zip(&shapes)
        .enumerate()
        .map(|(index, (layer, shape))| StepInfo {
            name: arch.layer_name(index),
            kind: layer.kind().to_string(),
            detail: match layer {
                LayerSpec::Conv1D { activation, .. }
                | LayerSpec::Dense { activation, .. }
                | LayerSpec::ActivationLayer { activation } => format!("{shape:?} {activation}"),
                _ => format!("{shape:?}"),
            },
        })
        .collect();

    let tensors = model
        .weights
        .iter()
        .map(|(name, tensor)| TensorInfo {
            name: name.clone(),
            shape: tensor.shape.clone(),
            dtype: "f32",
            size_bytes: tensor.len() * 4,
        })
        .collect();

    Ok(ModelInfo {
        path: PathBuf::new(),
        kind: "source",
        name: model.metadata.name.clone(),
        size_bytes: 0,
        input_shape: arch.input_shape.clone(),
        output_shape: arch.output_shape()?,
        precision: "float32".to_string(),
        optimized: None,
        parameters: model.parameter_count(),
        steps,
        tensors,
    })
}

/// Describe an in-memory lite model
pub fn lite_info(model: &LiteModel) -> ModelInfo {
    let dtype = match model.precision {
        NumericType::Float16 => "f16",
        NumericType::Float32 => "f32",
    };

    let steps = model
        .ops
        .iter()
        .enumerate()
        .map(|(index, op)| StepInfo {
            name: index.to_string(),
            kind: op.name().to_string(),
            detail: op_detail(op),
        })
        .collect();

    let tensors = model
        .tensors
        .iter()
        .map(|(name, tensor)| TensorInfo {
            name: name.clone(),
            shape: tensor.shape.clone(),
            dtype,
            size_bytes: tensor.data.len() * model.precision.size(),
        })
        .collect();

    ModelInfo {
        path: PathBuf::new(),
        kind: "lite",
        name: model.name.clone(),
        size_bytes: 0,
        input_shape: model.input_shape.clone(),
        output_shape: model.output_shape.clone(),
        precision: model.precision.to_string(),
        optimized: Some(model.optimized),
        parameters: model.parameter_count(),
        steps,
        tensors,
    }
}

fn op_detail(op: &Op) -> String {
    let refs = op.tensor_refs().join(", ");
    match op {
        Op::Conv1D { activation, .. } | Op::FullyConnected { activation, .. }
            if !activation.is_linear() =>
        {
            format!("{refs} +{activation}")
        }
        Op::MaxPool1D { pool_size, stride } | Op::AvgPool1D { pool_size, stride } => {
            format!("pool {pool_size}, stride {stride}")
        }
        _ => refs,
    }
}

impl ModelInfo {
    pub fn step_table(&self) -> Table {
        let first = if self.kind == "lite" { "#" } else { "Layer" };
        let mut builder = TableBuilder::new().headers(vec![first, "Kind", "Detail"]);
        for step in &self.steps {
            builder = builder.row(vec![step.name.as_str(), step.kind.as_str(), step.detail.as_str()]);
        }
        builder.build()
    }

    pub fn tensor_table(&self) -> Table {
        let mut builder = TableBuilder::new().headers(vec!["Tensor", "Shape", "Dtype", "Size"]);
        for tensor in &self.tensors {
            builder = builder.row(vec![
                tensor.name.clone(),
                format!("{:?}", tensor.shape),
                tensor.dtype.to_string(),
                format_bytes(tensor.size_bytes as u64),
            ]);
        }
        builder.build()
    }

    /// Human-readable report
    pub fn render(&self) -> String {
        let mut out = format!(
            "{} ({} model, {})\n  input {:?} -> output {:?}\n  precision {}",
            self.name,
            self.kind,
            format_bytes(self.size_bytes),
            self.input_shape,
            self.output_shape,
            self.precision,
        );
        if let Some(optimized) = self.optimized {
            out.push_str(if optimized { ", optimized" } else { ", unoptimized" });
        }
        out.push_str(&format!(
            "\n  {} parameters\n\n",
            format_number(self.parameters as u64)
        ));
        out.push_str(&self.step_table().render());
        out.push('\n');
        out.push_str(&self.tensor_table().render());
        out
    }
}
