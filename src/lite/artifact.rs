//! Lite artifact encoding and file handling

use super::{LiteHeader, LiteModel, LiteTensor, FORMAT_VERSION, HEADER_KEY};
use crate::convert::NumericType;
use crate::io::{decode_f32, encode_f16, encode_f32};
use crate::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

impl LiteModel {
    /// Encode the model as artifact bytes.
    ///
    /// Identical models always encode to identical bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let dtype = storage_dtype(self.precision);

        let tensor_data: Vec<(&str, Vec<u8>, Vec<usize>)> = self
            .tensors
            .iter()
            .map(|(name, tensor)| {
                let bytes = match self.precision {
                    NumericType::Float32 => encode_f32(&tensor.data),
                    NumericType::Float16 => encode_f16(&tensor.data),
                };
                (name.as_str(), bytes, tensor.shape.clone())
            })
            .collect();

        let views = tensor_data
            .iter()
            .map(|(name, bytes, shape)| {
                TensorView::new(dtype, shape.clone(), bytes)
                    .map(|view| (*name, view))
                    .map_err(|e| Error::Serialization(format!("tensor {name}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let header = serde_json::to_string(&self.header())
            .map_err(|e| Error::Serialization(format!("lite header serialization failed: {e}")))?;
        let metadata = HashMap::from([(HEADER_KEY.to_string(), header)]);

        safetensors::serialize(views, Some(metadata))
            .map_err(|e| Error::Serialization(format!("artifact serialization failed: {e}")))
    }

    /// Decode artifact bytes.
    ///
    /// Rejects containers without a lite header, with an unknown layout
    /// version, whose ops reference tensors that are not present, or whose
    /// tensors are not stored at the declared precision.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (_, st_metadata) = safetensors::SafeTensors::read_metadata(bytes)
            .map_err(|e| Error::UnsupportedModel(format!("not a lite artifact: {e}")))?;

        let header_json = st_metadata
            .metadata()
            .as_ref()
            .and_then(|m| m.get(HEADER_KEY))
            .ok_or_else(|| {
                Error::UnsupportedModel(format!("not a lite artifact: missing '{HEADER_KEY}' header"))
            })?;

        let header: LiteHeader = serde_json::from_str(header_json)
            .map_err(|e| Error::UnsupportedModel(format!("invalid lite header: {e}")))?;

        if header.format_version != FORMAT_VERSION {
            return Err(Error::UnsupportedModel(format!(
                "lite format version {} is not supported (expected {FORMAT_VERSION})",
                header.format_version
            )));
        }

        let safetensors = safetensors::SafeTensors::deserialize(bytes)
            .map_err(|e| Error::UnsupportedModel(format!("not a lite artifact: {e}")))?;

        // Tensor order follows first use by the ops
        let dtype = storage_dtype(header.precision);
        let mut tensors: Vec<(String, LiteTensor)> = Vec::new();
        for op in &header.ops {
            for name in op.tensor_refs() {
                if tensors.iter().any(|(n, _)| n == name) {
                    continue;
                }
                let view = safetensors.tensor(name).map_err(|_| {
                    Error::UnsupportedModel(format!(
                        "op {} references missing tensor {name}",
                        op.name()
                    ))
                })?;
                if view.dtype() != dtype {
                    return Err(Error::UnsupportedModel(format!(
                        "tensor {name} is stored as {:?} but the model precision is {}",
                        view.dtype(),
                        header.precision
                    )));
                }
                let tensor = LiteTensor {
                    shape: view.shape().to_vec(),
                    data: decode_f32(name, &view)?,
                };
                tensors.push((name.to_string(), tensor));
            }
        }

        Ok(Self {
            name: header.name,
            input_shape: header.input_shape,
            output_shape: header.output_shape,
            precision: header.precision,
            optimized: header.optimized,
            ops: header.ops,
            tensors,
        })
    }
}

fn storage_dtype(precision: NumericType) -> Dtype {
    match precision {
        NumericType::Float32 => Dtype::F32,
        NumericType::Float16 => Dtype::F16,
    }
}

/// Read a lite model from disk
pub fn read_lite_model(path: impl AsRef<Path>) -> Result<LiteModel> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::InputNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    LiteModel::from_bytes(&bytes)
}

/// Write artifact bytes to `path` atomically.
///
/// The bytes go to a temporary file in the destination directory which is
/// then renamed over `path`, so readers never observe a partial artifact.
/// With `overwrite` disabled an existing file is left untouched and the
/// call fails.
pub fn write_artifact(path: impl AsRef<Path>, bytes: &[u8], overwrite: bool) -> Result<()> {
    let path = path.as_ref();
    let failure = |reason: String| Error::OutputWriteFailure {
        path: path.to_path_buf(),
        reason,
    };

    if !overwrite && path.exists() {
        return Err(failure(
            "file exists and overwriting is disabled".to_string(),
        ));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| failure(e.to_string()))?;
    tmp.write_all(bytes).map_err(|e| failure(e.to_string()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| failure(e.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| failure(e.to_string()))?;
    }

    let persisted = if overwrite {
        tmp.persist(path)
    } else {
        tmp.persist_noclobber(path)
    };
    persisted.map_err(|e| failure(e.error.to_string()))?;

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
    Ok(())
}
