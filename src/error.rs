//! Error types for Aligerar

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Input model not found or unreadable: {path}: {source}")]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Conversion failed: {0}")]
    ConversionFailure(String),

    #[error("Failed to write output {path}: {reason}")]
    OutputWriteFailure { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Inference error: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code reported by the CLI for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InputNotFound { .. } => 2,
            Error::UnsupportedModel(_) => 3,
            Error::ConversionFailure(_) => 4,
            Error::OutputWriteFailure { .. } => 5,
            Error::Config(_) => 6,
            Error::Serialization(_) | Error::Runtime(_) | Error::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        let errors = [
            Error::InputNotFound {
                path: PathBuf::from("missing.json"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
            Error::UnsupportedModel("bad".into()),
            Error::ConversionFailure("bad".into()),
            Error::OutputWriteFailure {
                path: PathBuf::from("out.lite"),
                reason: "read-only".into(),
            },
            Error::Config("bad".into()),
        ];
        let mut codes: Vec<u8> = errors.iter().map(Error::exit_code).collect();
        codes.dedup();
        assert_eq!(codes, vec![2, 3, 4, 5, 6]);
        assert!(codes.iter().all(|c| *c != 0));
    }

    #[test]
    fn test_input_not_found_message_names_path() {
        let err = Error::InputNotFound {
            path: PathBuf::from("model/cnn1d_model.safetensors"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("cnn1d_model.safetensors"));
    }
}
