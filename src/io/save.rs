//! Model saving functionality

use super::dtype::encode_f32;
use super::format::{ModelFormat, SaveConfig};
use super::model::SavedModel;
use super::{GRAPH_KEY, LABEL_KEY, NAME_KEY, VERSION_KEY};
use crate::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use std::collections::HashMap;
use std::path::Path;

/// Save a source model to a file
///
/// # Arguments
///
/// * `model` - The model to save
/// * `path` - Output file path
/// * `config` - Save configuration (format, options)
///
/// # Example
///
/// ```no_run
/// use aligerar::graph::{Activation, Architecture, LayerSpec};
/// use aligerar::io::{save_model, ModelFormat, ModelMetadata, SaveConfig, SavedModel};
///
/// let arch = Architecture::new(vec![4]).with_layer(LayerSpec::Dense {
///     name: None,
///     units: 2,
///     activation: Activation::Softmax,
///     use_bias: true,
/// });
/// let model = SavedModel::initialize(ModelMetadata::new("my-model", "mlp"), arch, 0).unwrap();
///
/// save_model(&model, "model.safetensors", &SaveConfig::new(ModelFormat::SafeTensors)).unwrap();
/// ```
pub fn save_model(model: &SavedModel, path: impl AsRef<Path>, config: &SaveConfig) -> Result<()> {
    let path = path.as_ref();

    let data = match config.format {
        ModelFormat::SafeTensors => to_safetensors(model)?,
        ModelFormat::Json => {
            let state = model.to_state();
            let text = if config.pretty {
                serde_json::to_string_pretty(&state)
            } else {
                serde_json::to_string(&state)
            }
            .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
            text.into_bytes()
        }
        ModelFormat::Yaml => serde_yaml::to_string(&model.to_state())
            .map_err(|e| Error::Serialization(format!("YAML serialization failed: {e}")))?
            .into_bytes(),
    };

    std::fs::write(path, data).map_err(|e| Error::OutputWriteFailure {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    tracing::debug!(path = %path.display(), format = ?config.format, "saved model");
    Ok(())
}

/// Encode model in SafeTensors format with the architecture in the header
fn to_safetensors(model: &SavedModel) -> Result<Vec<u8>> {
    let tensor_data: Vec<(&str, Vec<u8>, Vec<usize>)> = model
        .weights
        .iter()
        .map(|(name, tensor)| (name.as_str(), encode_f32(&tensor.data), tensor.shape.clone()))
        .collect();

    let views = tensor_data
        .iter()
        .map(|(name, bytes, shape)| {
            TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map(|view| (*name, view))
                .map_err(|e| Error::Serialization(format!("tensor {name}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let graph = serde_json::to_string(&model.architecture)
        .map_err(|e| Error::Serialization(format!("architecture serialization failed: {e}")))?;

    let mut metadata = HashMap::new();
    metadata.insert(NAME_KEY.to_string(), model.metadata.name.clone());
    metadata.insert(LABEL_KEY.to_string(), model.metadata.architecture.clone());
    metadata.insert(VERSION_KEY.to_string(), model.metadata.version.clone());
    metadata.insert(GRAPH_KEY.to_string(), graph);

    safetensors::serialize(views, Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))
}
