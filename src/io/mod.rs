//! Model I/O - Loading and saving source models
//!
//! A source model is an architecture plus named f32 weights. It can be
//! stored as JSON, YAML or SafeTensors; the SafeTensors header carries the
//! architecture as a JSON string under the `graph` key.

mod dtype;
mod format;
mod load;
mod model;
mod save;


pub use format::{ModelFormat, SaveConfig};
pub use load::load_model;
pub use model::{ModelMetadata, ModelState, ParameterInfo, SavedModel, WeightTensor};
pub use save::save_model;

pub(crate) use dtype::{decode_f32, encode_f16, encode_f32};

pub(crate) const NAME_KEY: &str = "name";
pub(crate) const LABEL_KEY: &str = "architecture";
pub(crate) const VERSION_KEY: &str = "version";
pub(crate) const GRAPH_KEY: &str = "graph";
