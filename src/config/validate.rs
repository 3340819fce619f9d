//! Configuration validation

use super::schema::ConvertSpec;
use std::path::Path;

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Empty {0} path")]
    EmptyPath(&'static str),

    #[error("Input and output are the same file: {0}")]
    OutputIsInput(String),

    #[error("Invalid sample count: {0} (must be > 0)")]
    InvalidSamples(usize),

    #[error("Invalid tolerance: {0} (must be finite and >= 0.0)")]
    InvalidTolerance(f32),
}

/// Validate a conversion specification
///
/// Checks:
/// - Paths are non-empty
/// - The artifact would not replace the source model
///
/// Input existence is left to the loader and output writability to the
/// writer, so those failures report as `InputNotFound` and
/// `OutputWriteFailure` rather than as configuration problems.
pub fn validate_config(spec: &ConvertSpec) -> Result<(), ValidationError> {
    if spec.input.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath("input"));
    }
    if spec.output.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath("output"));
    }

    if same_file(&spec.input, &spec.output) {
        return Err(ValidationError::OutputIsInput(
            spec.output.display().to_string(),
        ));
    }

    Ok(())
}

/// Validate verification parameters
pub fn validate_verify(samples: usize, tolerance: f32) -> Result<(), ValidationError> {
    if samples == 0 {
        return Err(ValidationError::InvalidSamples(samples));
    }
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(ValidationError::InvalidTolerance(tolerance));
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_valid_spec() -> ConvertSpec {
        ConvertSpec {
            input: PathBuf::from("model.safetensors"),
            output: PathBuf::from("model.lite"),
            ..ConvertSpec::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&create_valid_spec()).is_ok());
    }

    #[test]
    fn test_empty_paths() {
        let mut spec = create_valid_spec();
        spec.input = PathBuf::new();
        assert!(matches!(
            validate_config(&spec).unwrap_err(),
            ValidationError::EmptyPath("input")
        ));

        let mut spec = create_valid_spec();
        spec.output = PathBuf::new();
        assert!(matches!(
            validate_config(&spec).unwrap_err(),
            ValidationError::EmptyPath("output")
        ));
    }

    #[test]
    fn test_output_same_as_input() {
        let mut spec = create_valid_spec();
        spec.output = spec.input.clone();
        assert!(matches!(
            validate_config(&spec).unwrap_err(),
            ValidationError::OutputIsInput(_)
        ));
    }

    #[test]
    fn test_output_directory_left_to_writer() {
        let dir = TempDir::new().unwrap();
        let mut spec = create_valid_spec();
        spec.output = dir.path().to_path_buf();
        assert!(validate_config(&spec).is_ok());
    }

    #[test]
    fn test_verify_parameters() {
        assert!(validate_verify(16, 1e-2).is_ok());
        assert!(validate_verify(1, 0.0).is_ok());
        assert!(matches!(
            validate_verify(0, 1e-2).unwrap_err(),
            ValidationError::InvalidSamples(0)
        ));
        assert!(matches!(
            validate_verify(4, -1.0).unwrap_err(),
            ValidationError::InvalidTolerance(_)
        ));
        assert!(validate_verify(4, f32::NAN).is_err());
    }
}
