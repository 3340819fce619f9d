//! End-to-end conversion tests through the public API

use aligerar::config::{load_config, resolve_convert, ConvertArgs};
use aligerar::convert::convert_file;
use aligerar::graph::{Activation, Architecture, LayerSpec, Padding};
use aligerar::io::{load_model, save_model, ModelFormat, ModelMetadata, SaveConfig, SavedModel};
use aligerar::lite::read_lite_model;
use aligerar::runtime::{verify, Interpreter};
use aligerar::{convert, ConversionOptions, Error, NumericType, OptimizationMode};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Accelerometer-style classifier: 64 steps of 3 channels, 6 classes
fn cnn1d_architecture() -> Architecture {
    Architecture::new(vec![64, 3])
        .with_layer(LayerSpec::Conv1D {
            name: None,
            filters: 16,
            kernel_size: 5,
            strides: 1,
            padding: Padding::Same,
            activation: Activation::Relu,
            use_bias: true,
        })
        .with_layer(LayerSpec::BatchNormalization {
            name: None,
            epsilon: 1e-3,
        })
        .with_layer(LayerSpec::MaxPooling1D {
            pool_size: 2,
            strides: None,
        })
        .with_layer(LayerSpec::Conv1D {
            name: None,
            filters: 32,
            kernel_size: 3,
            strides: 1,
            padding: Padding::Valid,
            activation: Activation::Linear,
            use_bias: false,
        })
        .with_layer(LayerSpec::BatchNormalization {
            name: None,
            epsilon: 1e-3,
        })
        .with_layer(LayerSpec::ActivationLayer {
            activation: Activation::Relu,
        })
        .with_layer(LayerSpec::GlobalAveragePooling1D)
        .with_layer(LayerSpec::Dropout { rate: 0.5 })
        .with_layer(LayerSpec::Dense {
            name: None,
            units: 32,
            activation: Activation::Relu,
            use_bias: true,
        })
        .with_layer(LayerSpec::Dense {
            name: Some("predictions".to_string()),
            units: 6,
            activation: Activation::Softmax,
            use_bias: true,
        })
}

fn cnn1d_model(seed: u64) -> SavedModel {
    SavedModel::initialize(
        ModelMetadata::new("cnn1d_model", "cnn1d"),
        cnn1d_architecture(),
        seed,
    )
    .unwrap()
}

fn write_source(dir: &Path, file: &str, format: ModelFormat) -> std::path::PathBuf {
    let path = dir.join(file);
    save_model(&cnn1d_model(2024), &path, &SaveConfig::new(format)).unwrap();
    path
}

#[test]
fn test_default_conversion_stays_close_to_source() {
    let dir = TempDir::new().unwrap();
    let input = write_source(dir.path(), "cnn1d_model.safetensors", ModelFormat::SafeTensors);
    let output = dir.path().join("cnn1d_model.lite");

    let report = convert(&input, &output, &ConversionOptions::default()).unwrap();
    assert_eq!(report.precision, NumericType::Float16);
    assert!(report.optimized);
    // conv+bn stays (bn follows relu), conv+bn+relu folds, dropout removed
    assert_eq!(report.ops, 7);

    let source = load_model(&input).unwrap();
    let lite = read_lite_model(&output).unwrap();
    let result = verify(&source, &lite, 50, 7, 1e-2).unwrap();
    assert!(result.passed(), "max diff {}", result.max_abs_diff);
    assert!(result.argmax_agreement >= 0.9);
}

#[test]
fn test_float32_optimized_matches_reference_tightly() {
    let dir = TempDir::new().unwrap();
    let input = write_source(dir.path(), "m.safetensors", ModelFormat::SafeTensors);
    let output = dir.path().join("m.lite");
    let options = ConversionOptions::new(OptimizationMode::Default, NumericType::Float32).unwrap();

    convert(&input, &output, &options).unwrap();
    let result = verify(
        &load_model(&input).unwrap(),
        &read_lite_model(&output).unwrap(),
        20,
        1,
        1e-4,
    )
    .unwrap();
    assert!(result.passed(), "max diff {}", result.max_abs_diff);
}

#[test]
fn test_conversion_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let input = write_source(dir.path(), "m.json", ModelFormat::Json);
    let output = dir.path().join("m.lite");

    convert(&input, &output, &ConversionOptions::default()).unwrap();
    let first = std::fs::read(&output).unwrap();
    convert(&input, &output, &ConversionOptions::default()).unwrap();
    let second = std::fs::read(&output).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_every_source_format_converts() {
    let dir = TempDir::new().unwrap();
    for (file, format) in [
        ("m.json", ModelFormat::Json),
        ("m.yaml", ModelFormat::Yaml),
        ("m.safetensors", ModelFormat::SafeTensors),
    ] {
        let input = write_source(dir.path(), file, format);
        let output = dir.path().join(format!("{file}.lite"));
        let report = convert(&input, &output, &ConversionOptions::default()).unwrap();
        assert_eq!(report.layers, 10);
        assert!(Interpreter::new(&read_lite_model(&output).unwrap()).is_ok());
    }
}

#[test]
fn test_missing_input_creates_no_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.lite");

    let err = convert(
        dir.path().join("model/cnn1d_model.safetensors"),
        &output,
        &ConversionOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::InputNotFound { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(!output.exists());
}

#[test]
fn test_unwritable_output_leaves_input_untouched() {
    let dir = TempDir::new().unwrap();
    let input = write_source(dir.path(), "m.safetensors", ModelFormat::SafeTensors);
    let before = std::fs::read(&input).unwrap();
    let output = dir.path().join("no-such-dir").join("m.lite");

    let err = convert(&input, &output, &ConversionOptions::default()).unwrap_err();

    assert!(matches!(err, Error::OutputWriteFailure { .. }));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(std::fs::read(&input).unwrap(), before);
    assert!(!output.exists());
}

#[test]
fn test_directory_output_is_write_failure() {
    let dir = TempDir::new().unwrap();
    let input = write_source(dir.path(), "m.safetensors", ModelFormat::SafeTensors);
    let output = dir.path().join("artifacts");
    std::fs::create_dir(&output).unwrap();

    let args = ConvertArgs {
        input: Some(input.clone()),
        output: Some(output.clone()),
        ..ConvertArgs::default()
    };
    let spec = resolve_convert(&args).unwrap();
    let err = convert_file(&spec.input, &spec.output, &spec.options().unwrap(), spec.overwrite)
        .unwrap_err();

    assert!(matches!(err, Error::OutputWriteFailure { .. }));
    assert_eq!(err.exit_code(), 5);
    assert!(output.is_dir());
}

#[test]
fn test_unknown_extension_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("model.h5");
    std::fs::write(&input, b"HDF5").unwrap();

    let err = convert(&input, dir.path().join("m.lite"), &ConversionOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedModel(_)));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_corrupt_source_is_unsupported() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("model.safetensors");
    std::fs::write(&input, b"\x08\x00\x00\x00\x00\x00\x00\x00garbage!").unwrap();

    let err = convert(&input, dir.path().join("m.lite"), &ConversionOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedModel(_)));
}

#[test]
fn test_invalid_option_combination() {
    let err = ConversionOptions::new(OptimizationMode::None, NumericType::Float16).unwrap_err();
    assert!(matches!(err, Error::ConversionFailure(_)));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_no_overwrite_refuses_existing_artifact() {
    let dir = TempDir::new().unwrap();
    let input = write_source(dir.path(), "m.safetensors", ModelFormat::SafeTensors);
    let output = dir.path().join("m.lite");
    std::fs::write(&output, b"previous artifact").unwrap();

    let err = convert_file(&input, &output, &ConversionOptions::default(), false).unwrap_err();
    assert!(matches!(err, Error::OutputWriteFailure { .. }));
    assert_eq!(std::fs::read(&output).unwrap(), b"previous artifact");
}

#[test]
fn test_yaml_config_drives_conversion() {
    let dir = TempDir::new().unwrap();
    let input = write_source(dir.path(), "m.safetensors", ModelFormat::SafeTensors);
    let output = dir.path().join("m.lite");

    let config_path = dir.path().join("convert.yaml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(file, "input: {}", input.display()).unwrap();
    writeln!(file, "output: {}", output.display()).unwrap();
    writeln!(file, "optimization: none").unwrap();
    writeln!(file, "precision: float32").unwrap();
    drop(file);

    let spec = load_config(&config_path).unwrap();
    let report = convert_file(&spec.input, &spec.output, &spec.options().unwrap(), spec.overwrite).unwrap();
    assert!(!report.optimized);
    assert_eq!(report.precision, NumericType::Float32);
    // one op per layer except dropout
    assert_eq!(report.ops, 9);

    // a precision flag over the same file gives float16 without optimization
    let args = ConvertArgs {
        precision: Some(NumericType::Float16),
        config: Some(config_path),
        ..ConvertArgs::default()
    };
    let spec = resolve_convert(&args).unwrap();
    assert!(matches!(spec.options(), Err(Error::ConversionFailure(_))));
}

#[test]
fn test_float16_artifact_smaller_than_float32() {
    let dir = TempDir::new().unwrap();
    let input = write_source(dir.path(), "m.safetensors", ModelFormat::SafeTensors);
    let f32_out = dir.path().join("f32.lite");
    let f16_out = dir.path().join("f16.lite");

    let f32_report = convert(
        &input,
        &f32_out,
        &ConversionOptions::new(OptimizationMode::Default, NumericType::Float32).unwrap(),
    )
    .unwrap();
    let f16_report = convert(&input, &f16_out, &ConversionOptions::default()).unwrap();

    assert!(f16_report.output_bytes < f32_report.output_bytes);
    let f32_lite = read_lite_model(&f32_out).unwrap();
    let f16_lite = read_lite_model(&f16_out).unwrap();
    assert_eq!(f16_lite.weight_bytes() * 2, f32_lite.weight_bytes());
}
