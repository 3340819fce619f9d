//! # Aligerar: model conversion for on-device inference
//!
//! Aligerar loads a trained sequential 1-D CNN, converts it into a compact
//! "lite" inference artifact and writes that artifact to disk.
//!
//! ## Architecture
//!
//! - **graph**: Sequential layer graph and shape inference
//! - **io**: Source model loading and saving (JSON, YAML, SafeTensors)
//! - **convert**: Conversion options, graph optimization, precision reduction
//! - **lite**: The lite artifact format
//! - **runtime**: Reference interpreter and prediction verification
//! - **inspect**: Tensor and op listings for either kind of model
//! - **config**: CLI and declarative YAML configuration
//!
//! ## Example
//!
//! ```no_run
//! use aligerar::{convert, ConversionOptions};
//!
//! let report = convert(
//!     "model/cnn1d_model.safetensors",
//!     "cnn1d_model.lite",
//!     &ConversionOptions::default(),
//! )?;
//! println!("{report}");
//! # Ok::<(), aligerar::Error>(())
//! ```

pub mod config;
pub mod convert;
pub mod graph;
pub mod inspect;
pub mod io;
pub mod lite;
pub mod logging;
pub mod output;
pub mod runtime;

pub mod error;

// Re-export commonly used types
pub use convert::{convert, convert_model, ConversionOptions, ConversionReport, NumericType, OptimizationMode};
pub use error::{Error, Result};
