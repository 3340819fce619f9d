//! Model conversion
//!
//! Conversion runs in four steps: every layer is lowered to an inference op,
//! the default optimization folds and fuses ops, constant tensors are
//! rounded to the target numeric type, and the result is packed into a
//! [`LiteModel`]. [`convert`] wraps this with loading and an atomic write.

mod lower;
mod optimize;
mod options;


pub use options::{ConversionOptions, NumericType, OptimizationMode};

use crate::io::{load_model, SavedModel};
use crate::lite::{write_artifact, LiteModel, LiteTensor};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Summary of a completed file conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Layers in the source architecture
    pub layers: usize,
    /// Ops in the written artifact
    pub ops: usize,
    pub tensors: usize,
    pub parameters: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub precision: NumericType,
    pub optimized: bool,
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Converted {} -> {} ({} layers -> {} ops, {}, {})",
            self.input.display(),
            self.output.display(),
            self.layers,
            self.ops,
            self.precision,
            crate::output::format_bytes(self.output_bytes),
        )
    }
}

/// Convert an in-memory model.
///
/// The model's architecture is checked again here so that models built in
/// code get the same guarantees as loaded ones.
pub fn convert_model(model: &SavedModel, options: &ConversionOptions) -> Result<LiteModel> {
    model.validate()?;
    let output_shape = model.architecture.output_shape()?;

    let mut nodes = lower::lower(model)?;
    if options.optimize() {
        let before = nodes.len();
        nodes = optimize::optimize(nodes)?;
        tracing::debug!(before, after = nodes.len(), "optimized op graph");
    }

    let target = options.target_type();
    let mut ops = Vec::with_capacity(nodes.len());
    let mut tensors = Vec::new();
    for node in nodes {
        for (name, tensor) in node.tensors {
            tensors.push((name.clone(), reduce_precision(name, tensor, target)?));
        }
        ops.push(node.op);
    }

    Ok(LiteModel {
        name: model.metadata.name.clone(),
        input_shape: model.architecture.input_shape.clone(),
        output_shape,
        precision: target,
        optimized: options.optimize(),
        ops,
        tensors,
    })
}

fn reduce_precision(name: String, mut tensor: LiteTensor, target: NumericType) -> Result<LiteTensor> {
    for value in &mut tensor.data {
        let rounded = target.round(*value);
        if !rounded.is_finite() {
            return Err(Error::ConversionFailure(format!(
                "tensor {name} value {value} is not representable as {target}"
            )));
        }
        *value = rounded;
    }
    Ok(tensor)
}

/// Load `input`, convert it and write the artifact to `output`,
/// replacing any existing file.
pub fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ConversionOptions,
) -> Result<ConversionReport> {
    convert_file(input, output, options, true)
}

/// [`convert`] with control over replacing an existing output
pub fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ConversionOptions,
    overwrite: bool,
) -> Result<ConversionReport> {
    let input = input.as_ref();
    let output = output.as_ref();

    tracing::info!(path = %input.display(), "loading model");
    let model = load_model(input)?;
    let input_bytes = std::fs::metadata(input).map_or(0, |m| m.len());

    tracing::info!(
        optimization = ?options.optimization(),
        precision = %options.target_type(),
        "converting model"
    );
    let lite = convert_model(&model, options)?;
    let bytes = lite.to_bytes()?;

    write_artifact(output, &bytes, overwrite)?;

    let report = ConversionReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        layers: model.architecture.layers.len(),
        ops: lite.ops.len(),
        tensors: lite.tensors.len(),
        parameters: lite.parameter_count(),
        input_bytes,
        output_bytes: bytes.len() as u64,
        precision: lite.precision,
        optimized: lite.optimized,
    };
    tracing::info!(
        path = %output.display(),
        ops = report.ops,
        bytes = report.output_bytes,
        "wrote lite model"
    );
    Ok(report)
}
