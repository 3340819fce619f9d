//! Model loading functionality

use super::dtype::decode_f32;
use super::format::ModelFormat;
use super::model::{ModelMetadata, ModelState, SavedModel, WeightTensor};
use super::{GRAPH_KEY, LABEL_KEY, NAME_KEY, VERSION_KEY};
use crate::graph::Architecture;
use crate::{Error, Result};
use std::path::Path;

/// Load a source model from a file
///
/// The format is detected from the file extension. The loaded model is
/// validated against its own architecture before it is returned, so a
/// successful load means every layer has correctly shaped weights.
///
/// # Errors
///
/// * [`Error::InputNotFound`] if the file cannot be read
/// * [`Error::UnsupportedModel`] if the extension is unknown or the content
///   does not describe a valid model
///
/// # Example
///
/// ```no_run
/// use aligerar::io::load_model;
///
/// let model = load_model("model/cnn1d_model.safetensors").unwrap();
/// println!("Loaded model: {}", model.metadata.name);
/// ```
pub fn load_model(path: impl AsRef<Path>) -> Result<SavedModel> {
    let path = path.as_ref();

    let bytes = std::fs::read(path).map_err(|source| Error::InputNotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let format = ModelFormat::from_path(path)?;
    tracing::debug!(path = %path.display(), ?format, bytes = bytes.len(), "read model file");

    let model = match format {
        ModelFormat::SafeTensors => load_safetensors(&bytes)?,
        ModelFormat::Json => {
            let state: ModelState = serde_json::from_slice(&bytes).map_err(|e| {
                Error::UnsupportedModel(format!("JSON deserialization failed: {e}"))
            })?;
            SavedModel::from_state(state)?
        }
        ModelFormat::Yaml => {
            let state: ModelState = serde_yaml::from_slice(&bytes).map_err(|e| {
                Error::UnsupportedModel(format!("YAML deserialization failed: {e}"))
            })?;
            SavedModel::from_state(state)?
        }
    };

    model.validate()?;
    Ok(model)
}

/// Load model from SafeTensors format (HuggingFace compatible)
fn load_safetensors(bytes: &[u8]) -> Result<SavedModel> {
    let (_, st_metadata) = safetensors::SafeTensors::read_metadata(bytes)
        .map_err(|e| Error::UnsupportedModel(format!("SafeTensors parsing failed: {e}")))?;

    let custom_meta = st_metadata.metadata().clone().unwrap_or_default();
    let graph = custom_meta.get(GRAPH_KEY).ok_or_else(|| {
        Error::UnsupportedModel(format!(
            "SafeTensors file carries no '{GRAPH_KEY}' metadata entry"
        ))
    })?;
    let architecture: Architecture = serde_json::from_str(graph)
        .map_err(|e| Error::UnsupportedModel(format!("invalid architecture metadata: {e}")))?;

    let mut metadata = ModelMetadata::new(
        custom_meta
            .get(NAME_KEY)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
        custom_meta
            .get(LABEL_KEY)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string()),
    );
    if let Some(version) = custom_meta.get(VERSION_KEY) {
        metadata.version = version.clone();
    }

    let safetensors = safetensors::SafeTensors::deserialize(bytes)
        .map_err(|e| Error::UnsupportedModel(format!("SafeTensors parsing failed: {e}")))?;

    // Keep architecture order for expected weights, then any extras by name
    let mut names: Vec<String> = architecture
        .expected_weights()?
        .into_iter()
        .map(|spec| spec.name)
        .filter(|name| safetensors.tensor(name).is_ok())
        .collect();
    let mut extras: Vec<String> = safetensors
        .tensors()
        .into_iter()
        .map(|(name, _)| name)
        .filter(|name| !names.contains(name))
        .collect();
    extras.sort();
    names.extend(extras);

    let weights = names
        .into_iter()
        .map(|name| {
            let view = safetensors
                .tensor(&name)
                .map_err(|e| Error::UnsupportedModel(format!("tensor {name}: {e}")))?;
            let data = decode_f32(&name, &view)?;
            let tensor = WeightTensor::new(view.shape().to_vec(), data)?;
            Ok((name, tensor))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(SavedModel::new(metadata, architecture, weights))
}
