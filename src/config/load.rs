//! Conversion config loading

use super::cli::{apply_overrides, ConvertArgs};
use super::schema::ConvertSpec;
use super::validate::validate_config;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Load a conversion spec from a YAML file
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<ConvertSpec> {
    let spec = read_spec(config_path.as_ref())?;
    validate_config(&spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;
    Ok(spec)
}

/// Build the effective spec for a run: config file (if any), then flags.
pub fn resolve_convert(args: &ConvertArgs) -> Result<ConvertSpec> {
    let mut spec = match &args.config {
        Some(path) => read_spec(path)?,
        None => ConvertSpec::default(),
    };
    apply_overrides(&mut spec, args);
    validate_config(&spec).map_err(|e| Error::Config(format!("Invalid config: {e}")))?;
    Ok(spec)
}

fn read_spec(path: &Path) -> Result<ConvertSpec> {
    let yaml_content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    serde_yaml::from_str(&yaml_content)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))
}
