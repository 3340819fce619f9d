#![no_main]

use aligerar::{convert_model, ConversionOptions};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::io::Write;

#[derive(Arbitrary, Debug)]
struct SourceInput {
    format: u8,
    bytes: Vec<u8>,
    float16: bool,
}

/// Fuzz target for source model loading and conversion
///
/// Malformed files must surface as errors, never as panics.
fuzz_target!(|input: SourceInput| {
    let suffix = match input.format % 3 {
        0 => ".json",
        1 => ".yaml",
        _ => ".safetensors",
    };
    let Ok(mut file) = tempfile::Builder::new().suffix(suffix).tempfile() else {
        return;
    };
    if file.write_all(&input.bytes).is_err() {
        return;
    }
    let Ok(model) = aligerar::io::load_model(file.path()) else {
        return;
    };
    let options = if input.float16 {
        ConversionOptions::default()
    } else {
        ConversionOptions::reference()
    };
    let _ = convert_model(&model, &options);
});
