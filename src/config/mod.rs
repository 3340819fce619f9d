//! Command line and declarative YAML configuration
//!
//! A conversion can be described entirely by flags or by a YAML file,
//! with flags taking precedence:
//!
//! ```yaml
//! input: model/cnn1d_model.safetensors
//! output: cnn1d_model.lite
//! optimization: default   # or: none
//! precision: float16      # or: float32
//! overwrite: true
//! ```

mod cli;
mod load;
mod schema;
mod validate;

pub use cli::{
    apply_overrides, parse_args, Cli, Command, ConvertArgs, InspectArgs, VerifyArgs,
};
pub use load::{load_config, resolve_convert};
pub use schema::{ConvertSpec, DEFAULT_INPUT, DEFAULT_OUTPUT};
pub use validate::{validate_config, validate_verify, ValidationError};
