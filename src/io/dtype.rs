//! Raw tensor byte encoding shared by the source and lite formats

use crate::{Error, Result};
use half::f16;
use safetensors::tensor::{Dtype, TensorView};

/// Little-endian f32 bytes
pub(crate) fn encode_f32(values: &[f32]) -> Vec<u8> {
    if cfg!(target_endian = "little") {
        bytemuck::cast_slice(values).to_vec()
    } else {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Little-endian IEEE half-precision bytes (round to nearest even)
pub(crate) fn encode_f16(values: &[f32]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| f16::from_f32(*v).to_le_bytes())
        .collect()
}

/// Decode a tensor view to f32, widening half-precision data.
///
/// Views are decoded chunk by chunk since safetensors data carries no
/// alignment guarantee.
pub(crate) fn decode_f32(name: &str, view: &TensorView<'_>) -> Result<Vec<f32>> {
    let bytes = view.data();
    match view.dtype() {
        Dtype::F32 => Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()),
        Dtype::F16 => Ok(bytes
            .chunks_exact(2)
            .map(|c| f16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect()),
        Dtype::BF16 => Ok(bytes
            .chunks_exact(2)
            .map(|c| half::bf16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect()),
        other => Err(Error::UnsupportedModel(format!(
            "tensor {name} has unsupported dtype {other:?}"
        ))),
    }
}
