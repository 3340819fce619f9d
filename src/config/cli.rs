//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! aligerar                                      # model/cnn1d_model.safetensors -> cnn1d_model.lite
//! aligerar model.safetensors model.lite --precision float32
//! aligerar --config convert.yaml --no-overwrite
//! aligerar inspect model.lite --format json
//! aligerar verify model.safetensors model.lite --samples 64
//! ```

use super::schema::ConvertSpec;
use crate::convert::{NumericType, OptimizationMode};
use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Aligerar: convert trained models into compact inference artifacts
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "aligerar")]
#[command(author = "PAIML")]
#[command(version)]
#[command(about = "Convert trained 1-D CNN models into compact lite inference artifacts")]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Subcommand to execute; converts when omitted
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub convert: ConvertArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Convert a source model into a lite artifact
    Convert(ConvertArgs),

    /// List the tensors and ops of a source model or lite artifact
    Inspect(InspectArgs),

    /// Compare a lite artifact's predictions with its source model
    Verify(VerifyArgs),
}

/// Arguments for conversion
#[derive(Args, Debug, Clone, PartialEq, Default)]
pub struct ConvertArgs {
    /// Source model (json, yaml or safetensors) [default: model/cnn1d_model.safetensors]
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Artifact to write [default: cnn1d_model.lite]
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Stored tensor type (float16, float32)
    #[arg(short, long)]
    pub precision: Option<NumericType>,

    /// Fold and fuse layers (default)
    #[arg(long, overrides_with = "no_optimize")]
    pub optimize: bool,

    /// Translate layers one to one
    #[arg(long, overrides_with = "optimize")]
    pub no_optimize: bool,

    /// Fail instead of replacing an existing artifact
    #[arg(long)]
    pub no_overwrite: bool,

    /// YAML conversion config; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Arguments for the inspect command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct InspectArgs {
    /// Source model or lite artifact
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the verify command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct VerifyArgs {
    /// Source model the artifact was converted from
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Lite artifact to check
    #[arg(value_name = "LITE")]
    pub lite: PathBuf,

    /// Number of random input samples
    #[arg(short = 'n', long, default_value_t = 32)]
    pub samples: usize,

    /// Seed for the random inputs
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Largest accepted absolute difference per output
    #[arg(short, long, default_value_t = 1e-2)]
    pub tolerance: f32,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Apply command-line overrides to a ConvertSpec
pub fn apply_overrides(spec: &mut ConvertSpec, args: &ConvertArgs) {
    if let Some(input) = &args.input {
        spec.input = input.clone();
    }
    if let Some(output) = &args.output {
        spec.output = output.clone();
    }
    if let Some(precision) = args.precision {
        spec.precision = precision;
    }
    if args.optimize {
        spec.optimization = OptimizationMode::Default;
    }
    if args.no_optimize {
        spec.optimization = OptimizationMode::None;
    }
    if args.no_overwrite {
        spec.overwrite = false;
    }
}

impl Cli {
    /// The command to run; bare arguments mean `convert`
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Convert(self.convert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_converts_with_defaults() {
        let cli = parse_args(["aligerar"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.into_command(), Command::Convert(ConvertArgs::default()));
    }

    #[test]
    fn test_positional_paths() {
        let cli = parse_args(["aligerar", "in.json", "out.lite"]).unwrap();
        let Command::Convert(args) = cli.into_command() else {
            panic!("Expected Convert command");
        };
        assert_eq!(args.input, Some(PathBuf::from("in.json")));
        assert_eq!(args.output, Some(PathBuf::from("out.lite")));
    }

    #[test]
    fn test_explicit_convert_command() {
        let cli = parse_args(["aligerar", "convert", "in.yaml", "--precision", "float32"]).unwrap();
        match &cli.command {
            Some(Command::Convert(args)) => {
                assert_eq!(args.input, Some(PathBuf::from("in.yaml")));
                assert_eq!(args.precision, Some(NumericType::Float32));
            }
            _ => panic!("Expected Convert command"),
        }
    }

    #[test]
    fn test_optimize_flags_last_wins() {
        let cli = parse_args(["aligerar", "--optimize", "--no-optimize"]).unwrap();
        assert!(cli.convert.no_optimize);
        assert!(!cli.convert.optimize);

        let cli = parse_args(["aligerar", "--no-optimize", "--optimize"]).unwrap();
        assert!(cli.convert.optimize);
        assert!(!cli.convert.no_optimize);
    }

    #[test]
    fn test_invalid_precision_rejected() {
        assert!(parse_args(["aligerar", "--precision", "int8"]).is_err());
    }

    #[test]
    fn test_parse_inspect_command() {
        let cli = parse_args(["aligerar", "inspect", "model.lite", "--format", "json"]).unwrap();
        match &cli.command {
            Some(Command::Inspect(args)) => {
                assert_eq!(args.model, PathBuf::from("model.lite"));
                assert_eq!(args.format, OutputFormat::Json);
            }
            _ => panic!("Expected Inspect command"),
        }
        assert!(matches!(cli.into_command(), Command::Inspect(_)));
    }

    #[test]
    fn test_parse_verify_command() {
        let cli = parse_args([
            "aligerar",
            "verify",
            "model.safetensors",
            "model.lite",
            "-n",
            "8",
            "--seed",
            "42",
            "--tolerance",
            "0.001",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Verify(args)) => {
                assert_eq!(args.source, PathBuf::from("model.safetensors"));
                assert_eq!(args.lite, PathBuf::from("model.lite"));
                assert_eq!(args.samples, 8);
                assert_eq!(args.seed, 42);
                assert!((args.tolerance - 0.001).abs() < 1e-9);
            }
            _ => panic!("Expected Verify command"),
        }
    }

    #[test]
    fn test_verify_defaults() {
        let cli = parse_args(["aligerar", "verify", "a.json", "b.lite"]).unwrap();
        match cli.command {
            Some(Command::Verify(args)) => {
                assert_eq!(args.samples, 32);
                assert_eq!(args.seed, 0);
                assert_eq!(args.format, OutputFormat::Text);
            }
            _ => panic!("Expected Verify command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = parse_args(["aligerar", "inspect", "m.lite", "-v"]).unwrap();
        assert!(cli.verbose && !cli.quiet);

        let cli = parse_args(["aligerar", "-q", "in.json"]).unwrap();
        assert!(cli.quiet && !cli.verbose);
    }

    #[test]
    fn test_apply_overrides() {
        let mut spec = ConvertSpec::default();
        let args = ConvertArgs {
            input: Some(PathBuf::from("a.json")),
            precision: Some(NumericType::Float32),
            no_optimize: true,
            no_overwrite: true,
            ..ConvertArgs::default()
        };
        apply_overrides(&mut spec, &args);

        assert_eq!(spec.input, PathBuf::from("a.json"));
        assert_eq!(spec.output, PathBuf::from("cnn1d_model.lite"));
        assert_eq!(spec.precision, NumericType::Float32);
        assert_eq!(spec.optimization, OptimizationMode::None);
        assert!(!spec.overwrite);
    }

    #[test]
    fn test_apply_no_overrides_keeps_spec() {
        let mut spec = ConvertSpec {
            optimization: OptimizationMode::None,
            precision: NumericType::Float32,
            ..ConvertSpec::default()
        };
        let before = spec.clone();
        apply_overrides(&mut spec, &ConvertArgs::default());
        assert_eq!(spec, before);
    }

    #[test]
    fn test_unknown_flag() {
        assert!(parse_args(["aligerar", "--quantize"]).is_err());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn path_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,12}\\.(json|yaml|safetensors)"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_positional_input_round_trips(input in path_strategy()) {
            let cli = parse_args(["aligerar", input.as_str()]).unwrap();
            prop_assert_eq!(cli.convert.input, Some(PathBuf::from(&input)));
        }

        #[test]
        fn prop_precision_case_insensitive(
            precision in prop::sample::select(vec!["float16", "FLOAT16", "f16", "fp32", "Float32"])
        ) {
            let cli = parse_args(["aligerar", "--precision", precision]);
            prop_assert!(cli.is_ok());
        }

        #[test]
        fn prop_verify_samples_parse(samples in 1usize..10_000, seed in any::<u64>()) {
            let samples_arg = samples.to_string();
            let seed_arg = seed.to_string();
            let cli = parse_args([
                "aligerar", "verify", "m.json", "m.lite",
                "--samples", samples_arg.as_str(), "--seed", seed_arg.as_str(),
            ]).unwrap();
            match cli.command {
                Some(Command::Verify(args)) => {
                    prop_assert_eq!(args.samples, samples);
                    prop_assert_eq!(args.seed, seed);
                }
                _ => prop_assert!(false, "Expected Verify command"),
            }
        }
    }
}
